//! Kernel creation, argument binding, and launch submission.
//!
//! Bindings are per-slot calls that each return their own `Result`, so a
//! failed binding is attributable to its slot instead of disappearing into a
//! combined status. A launch hands back a [`LaunchEvent`] that the readback
//! consumes, making the launch → read dependency explicit in the interface.

use crate::buffer::DeviceBuffer;
use crate::error::{DispatchError, Result};
use crate::program::CompiledProgram;
use crate::work_size::LaunchGeometry;
use bytemuck::Pod;
use opencl3::command_queue::CommandQueue;
use opencl3::error_codes::ClError;
use opencl3::event::Event;
use opencl3::kernel::Kernel;
use opencl3::types::cl_event;
use std::fmt;
use std::ptr;
use tracing::debug;

/// A named entry point extracted from a successfully compiled program.
pub struct KernelHandle {
    kernel: Kernel,
    name: String,
}

impl KernelHandle {
    /// Instantiate the entry point `name` from `program`.
    pub fn create(program: &CompiledProgram, name: &str) -> Result<Self> {
        let kernel = Kernel::create(program.raw(), name).map_err(|code| {
            DispatchError::KernelNotFound {
                name: name.to_string(),
                code,
            }
        })?;
        debug!(kernel = name, "created kernel");
        Ok(KernelHandle {
            kernel,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind a plain value (scalar or fixed-size array) to argument `slot`.
    pub fn bind_scalar<T: Pod>(&self, slot: u32, value: &T) -> Result<()> {
        // SAFETY: `T: Pod` means a fixed-layout value without padding or
        // pointers, so the backend receives exactly `size_of::<T>()` valid
        // bytes; it rejects the call if the slot expects a different size.
        unsafe { self.kernel.set_arg(slot, value) }.map_err(|code| self.binding_error(slot, code))
    }

    /// Bind a device buffer handle to argument `slot`.
    pub fn bind_buffer<T: Pod>(&self, slot: u32, buffer: &DeviceBuffer<T>) -> Result<()> {
        // SAFETY: the argument is the buffer's `cl_mem` handle, which stays
        // alive for as long as the borrowed `DeviceBuffer` does; the backend
        // checks that the slot is a memory-object parameter.
        unsafe { self.kernel.set_arg(slot, buffer.raw()) }
            .map_err(|code| self.binding_error(slot, code))
    }

    /// Reserve `size_bytes` of work-group local scratch for argument `slot`.
    /// No host data backs a local argument.
    pub fn bind_local(&self, slot: u32, size_bytes: usize) -> Result<()> {
        // SAFETY: local arguments carry a size and no pointer; the backend
        // rejects sizes that exceed the device's local memory.
        unsafe { self.kernel.set_arg_local_buffer(slot, size_bytes) }
            .map_err(|code| self.binding_error(slot, code))
    }

    /// Submit the kernel to `queue` with the given geometry, returning the
    /// completion event. The call itself does not wait; the readback (or an
    /// explicit [`LaunchEvent::wait`]) is the synchronization point.
    pub fn launch(&self, queue: &CommandQueue, geometry: LaunchGeometry) -> Result<LaunchEvent> {
        let global = [geometry.global()];
        let local;
        let local_ptr = match geometry.local() {
            Some(size) => {
                local = [size];
                local.as_ptr()
            }
            None => ptr::null(),
        };

        debug!(
            kernel = %self.name,
            global = geometry.global(),
            local = ?geometry.local(),
            "enqueueing kernel"
        );

        // SAFETY: every argument slot was bound through the checked binding
        // calls above; the geometry is validated (nonzero, global a multiple
        // of local); work starts at offset zero (null offset pointer).
        let event = unsafe {
            queue.enqueue_nd_range_kernel(
                self.kernel.get(),
                1,
                ptr::null(),
                global.as_ptr(),
                local_ptr,
                &[],
            )
        }
        .map_err(|code| DispatchError::Enqueue {
            kernel: self.name.clone(),
            code,
        })?;

        Ok(LaunchEvent {
            event,
            kernel: self.name.clone(),
        })
    }

    fn binding_error(&self, slot: u32, code: ClError) -> DispatchError {
        DispatchError::ArgumentBinding {
            kernel: self.name.clone(),
            slot,
            code,
        }
    }
}

// Manual impl: opencl3's Kernel does not implement Debug.
impl fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("name", &self.name)
            .finish()
    }
}

/// Completion handle for one submitted launch.
pub struct LaunchEvent {
    event: Event,
    kernel: String,
}

impl LaunchEvent {
    /// Block until the launch has finished on the device.
    pub fn wait(&self) -> Result<()> {
        self.event
            .wait()
            .map_err(|code| DispatchError::CompletionWait {
                kernel: self.kernel.clone(),
                code,
            })
    }

    /// Kernel execution time in milliseconds, available once the launch has
    /// completed on a queue created with profiling enabled. `None` when
    /// profiling is off or the timestamps are not yet valid.
    pub fn elapsed_ms(&self) -> Option<f64> {
        let start = self.event.profiling_command_start().ok()?;
        let end = self.event.profiling_command_end().ok()?;
        if end >= start {
            Some((end - start) as f64 / 1_000_000.0)
        } else {
            None
        }
    }

    pub(crate) fn raw(&self) -> cl_event {
        self.event.get()
    }
}

// Manual impl: opencl3's Event does not implement Debug.
impl fmt::Debug for LaunchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchEvent")
            .field("kernel", &self.kernel)
            .finish()
    }
}
