//! Dispatch pipeline error types.

use opencl3::error_codes::ClError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the dispatch pipeline.
///
/// Every pipeline step maps backend rejections into a variant carrying enough
/// context to identify the failing step without a debugger: the argument slot,
/// the byte size, the entry-point name, or the full compiler log.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no OpenCL platform found")]
    NoPlatform,

    #[error("no device of class [{searched}] found on any platform")]
    NoDevice { searched: String },

    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(ClError),

    #[error("context creation failed: {0}")]
    ContextCreation(ClError),

    #[error("command queue creation failed: {0}")]
    QueueCreation(ClError),

    #[error("failed to read kernel source {}: {source}", path.display())]
    SourceLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("program creation rejected by the backend: {0}")]
    ProgramCreation(ClError),

    #[error("kernel build failed:\n{log}")]
    BuildFailed { log: String },

    #[error("kernel entry point `{name}` not found: {code}")]
    KernelNotFound { name: String, code: ClError },

    #[error("buffer creation of {size_bytes} bytes failed: {code}")]
    BufferCreation { size_bytes: usize, code: ClError },

    #[error("argument binding for `{kernel}` slot {slot} rejected: {code}")]
    ArgumentBinding {
        kernel: String,
        slot: u32,
        code: ClError,
    },

    #[error("enqueue of kernel `{kernel}` failed: {code}")]
    Enqueue { kernel: String, code: ClError },

    #[error("wait for kernel `{kernel}` completion failed: {code}")]
    CompletionWait { kernel: String, code: ClError },

    #[error("blocking readback of {size_bytes} bytes failed: {code}")]
    Readback { size_bytes: usize, code: ClError },

    #[error("invalid work size: {0}")]
    InvalidWorkSize(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, DispatchError>;
