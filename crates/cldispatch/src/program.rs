//! Kernel program compilation with build-log capture.

use crate::context::DispatchContext;
use crate::error::{DispatchError, Result};
use opencl3::program::Program;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Kernel source text, either embedded in the binary or loaded from a file.
#[derive(Clone, Debug)]
pub struct ProgramSource {
    text: String,
}

impl ProgramSource {
    /// Read kernel source in full from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DispatchError::SourceLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ProgramSource { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<&str> for ProgramSource {
    fn from(text: &str) -> Self {
        ProgramSource {
            text: text.to_string(),
        }
    }
}

impl From<String> for ProgramSource {
    fn from(text: String) -> Self {
        ProgramSource { text }
    }
}

/// A program that compiled successfully for the context's device. The only
/// way to obtain one is [`CompiledProgram::build`], so a kernel can never be
/// created from a failed build.
pub struct CompiledProgram {
    program: Program,
}

impl CompiledProgram {
    /// Create and build `source` for the context's device, consuming the
    /// source text once the backend owns a compiled copy.
    ///
    /// On a build failure the compiler log is always fetched and returned in
    /// [`DispatchError::BuildFailed`]; it is the only diagnostic surface the
    /// pipeline offers, so it is never skipped or truncated.
    pub fn build(ctx: &DispatchContext, source: ProgramSource) -> Result<Self> {
        let options = ctx.build_options();
        debug!(
            bytes = source.text.len(),
            options,
            "building kernel program"
        );

        let mut program = Program::create_from_source(ctx.context(), &source.text)
            .map_err(DispatchError::ProgramCreation)?;

        if let Err(code) = program.build(&[ctx.device_id()], options) {
            let log = match program.get_build_log(ctx.device_id()) {
                Ok(log) if !log.trim().is_empty() => log,
                // Some drivers hand back an empty log; the status code is
                // then the only diagnostic left.
                Ok(_) => format!("build failed with {code} (no log produced)"),
                Err(_) => format!("build failed with {code} (log unavailable)"),
            };
            warn!(%code, "kernel build failed");
            return Err(DispatchError::BuildFailed { log });
        }

        debug!("kernel program built");
        Ok(CompiledProgram { program })
    }

    pub(crate) fn raw(&self) -> &Program {
        &self.program
    }
}

// Manual impl: opencl3's Program does not implement Debug.
impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram").finish_non_exhaustive()
    }
}
