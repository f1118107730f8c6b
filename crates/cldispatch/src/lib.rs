//! `cldispatch`: a minimal OpenCL compute dispatch pipeline.
//!
//! One device, one context, one in-order queue: the crate covers the host
//! side of a single kernel launch from device discovery through blocking
//! readback, with the compiler log surfaced on build failure.
//!
//! | Module      | Responsibility                                        |
//! |-------------|-------------------------------------------------------|
//! | `device`    | Platform/device probing and ranked device selection   |
//! | `context`   | Context + command queue ownership, run configuration  |
//! | `program`   | Source loading and builds with diagnostic capture     |
//! | `buffer`    | Typed device buffers, seeded or uninitialized         |
//! | `kernel`    | Entry points, per-slot argument binding, launches     |
//! | `work_size` | Task/range geometry and input partitioning            |
//! | `error`     | The pipeline error taxonomy                           |
//!
//! # Usage
//!
//! ```rust,no_run
//! use cldispatch::{
//!     AccessMode, CompiledProgram, DeviceBuffer, DispatchConfig, DispatchContext,
//!     KernelHandle, LaunchGeometry, ProgramSource,
//! };
//!
//! # fn main() -> cldispatch::Result<()> {
//! let ctx = DispatchContext::new(DispatchConfig::default())?;
//! let program = CompiledProgram::build(&ctx, ProgramSource::from(
//!     "__kernel void fill(__global float* out) { out[0] = 42.0f; }",
//! ))?;
//! let kernel = KernelHandle::create(&program, "fill")?;
//! let out = DeviceBuffer::<f32>::new_uninit(&ctx, AccessMode::WriteOnly, 1)?;
//! kernel.bind_buffer(0, &out)?;
//! let done = kernel.launch(ctx.queue(), LaunchGeometry::task())?;
//! let host = out.read_blocking(ctx.queue(), Some(&done))?;
//! assert_eq!(host[0], 42.0);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod context;
pub mod device;
pub mod error;
pub mod kernel;
pub mod program;
pub mod work_size;

pub use buffer::{AccessMode, DeviceBuffer};
pub use context::{DispatchConfig, DispatchContext};
pub use device::{
    probe_devices, select_device, DeviceClass, DeviceInfo, PlatformReport, SelectedDevice,
    CPU_ONLY, GPU_ONLY, PREFER_GPU,
};
pub use error::{DispatchError, Result};
pub use kernel::{KernelHandle, LaunchEvent};
pub use program::{CompiledProgram, ProgramSource};
pub use work_size::{LaunchGeometry, RangePlan};
