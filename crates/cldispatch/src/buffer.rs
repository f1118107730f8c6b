//! Device buffer management with blocking readback.

use crate::context::DispatchContext;
use crate::error::{DispatchError, Result};
use crate::kernel::LaunchEvent;
use bytemuck::Pod;
use opencl3::command_queue::CommandQueue;
use opencl3::error_codes::{ClError, CL_INVALID_BUFFER_SIZE};
use opencl3::memory::{
    Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY,
};
use opencl3::types::{cl_event, CL_BLOCKING};
use std::ffi::c_void;
use std::fmt;
use std::ptr;
use tracing::debug;

/// Access mode of a device buffer, from the kernel's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    fn flags(self) -> u64 {
        match self {
            AccessMode::ReadOnly => CL_MEM_READ_ONLY,
            AccessMode::WriteOnly => CL_MEM_WRITE_ONLY,
            AccessMode::ReadWrite => CL_MEM_READ_WRITE,
        }
    }
}

/// A device-resident buffer of `len` elements of `T`.
pub struct DeviceBuffer<T> {
    inner: Buffer<T>,
    len: usize,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Create a buffer seeded from `data`; the copy happens at creation time
    /// (`CL_MEM_COPY_HOST_PTR`), so the host slice is free to go away
    /// afterwards.
    pub fn from_slice(ctx: &DispatchContext, mode: AccessMode, data: &[T]) -> Result<Self> {
        let size_bytes = byte_size::<T>(data.len())?;
        // SAFETY: COPY_HOST_PTR copies `data` during the call itself, so the
        // borrow outliving the call is all the validity the backend needs.
        // The pointer is read-only despite the *mut signature.
        let inner = unsafe {
            Buffer::<T>::create(
                ctx.context(),
                mode.flags() | CL_MEM_COPY_HOST_PTR,
                data.len(),
                data.as_ptr() as *mut c_void,
            )
        }
        .map_err(|code| DispatchError::BufferCreation { size_bytes, code })?;
        debug!(size_bytes, mode = ?mode, "created seeded device buffer");
        Ok(DeviceBuffer {
            inner,
            len: data.len(),
        })
    }

    /// Create a buffer of `len` elements with undefined contents; a kernel
    /// is expected to write it before anything reads it back.
    pub fn new_uninit(ctx: &DispatchContext, mode: AccessMode, len: usize) -> Result<Self> {
        let size_bytes = byte_size::<T>(len)?;
        // SAFETY: no host pointer is supplied (null), so there is nothing to
        // copy; the device contents stay undefined until a kernel writes.
        let inner =
            unsafe { Buffer::<T>::create(ctx.context(), mode.flags(), len, ptr::null_mut()) }
                .map_err(|code| DispatchError::BufferCreation { size_bytes, code })?;
        debug!(size_bytes, mode = ?mode, "created uninitialized device buffer");
        Ok(DeviceBuffer { inner, len })
    }

    /// Blocking readback of the whole buffer.
    ///
    /// When `after` is given, the transfer waits for that launch to complete
    /// first; this is the pipeline's only synchronization barrier, and by the
    /// time the call returns the data is on the host.
    pub fn read_blocking(
        &self,
        queue: &CommandQueue,
        after: Option<&LaunchEvent>,
    ) -> Result<Vec<T>> {
        let mut out = vec![T::zeroed(); self.len];
        let wait_list: Vec<cl_event> = after.iter().map(|e| e.raw()).collect();
        // SAFETY: `out` holds exactly `len` elements of `T`, the buffer's own
        // size; CL_BLOCKING keeps the borrow live until the copy has landed;
        // the wait list orders the read after the launch that produced the
        // data.
        unsafe {
            queue.enqueue_read_buffer(&self.inner, CL_BLOCKING, 0, &mut out, &wait_list)
        }
        .map_err(|code| DispatchError::Readback {
            size_bytes: self.size_bytes(),
            code,
        })?;
        debug!(size_bytes = self.size_bytes(), "read back device buffer");
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    pub(crate) fn raw(&self) -> &Buffer<T> {
        &self.inner
    }
}

// Manual impl: opencl3's Buffer does not implement Debug.
impl<T> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.len)
            .field("elem_size", &std::mem::size_of::<T>())
            .finish()
    }
}

/// Byte size of `len` elements, rejecting zero-length buffers and overflow
/// before the backend sees them.
fn byte_size<T>(len: usize) -> Result<usize> {
    if len == 0 {
        return Err(DispatchError::BufferCreation {
            size_bytes: 0,
            code: ClError(CL_INVALID_BUFFER_SIZE),
        });
    }
    len.checked_mul(std::mem::size_of::<T>())
        .ok_or(DispatchError::BufferCreation {
            size_bytes: usize::MAX,
            code: ClError(CL_INVALID_BUFFER_SIZE),
        })
}
