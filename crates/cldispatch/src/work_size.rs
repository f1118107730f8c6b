//! Launch geometry for task and range dispatches.
//!
//! A task launch is a single implicit work-item. A range launch derives its
//! shape from the device: the local size is the compute-unit count clamped to
//! the device's work-group limit, the global size is `local × compute_units`,
//! and the input is partitioned so every work-item owns a contiguous share.

use crate::device::DeviceInfo;
use crate::error::{DispatchError, Result};

/// Global/local work sizes for one launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchGeometry {
    global: usize,
    local: Option<usize>,
}

impl LaunchGeometry {
    /// Single implicit unit of work; the kernel processes everything itself.
    pub fn task() -> Self {
        LaunchGeometry {
            global: 1,
            local: None,
        }
    }

    /// One-dimensional launch with explicit sizes. `global` must be a
    /// nonzero multiple of a nonzero `local`.
    pub fn linear(global: usize, local: usize) -> Result<Self> {
        if global == 0 || local == 0 {
            return Err(DispatchError::InvalidWorkSize(format!(
                "work sizes must be nonzero (global {global}, local {local})"
            )));
        }
        if global % local != 0 {
            return Err(DispatchError::InvalidWorkSize(format!(
                "global size {global} is not a multiple of local size {local}"
            )));
        }
        Ok(LaunchGeometry {
            global,
            local: Some(local),
        })
    }

    pub fn global(&self) -> usize {
        self.global
    }

    pub fn local(&self) -> Option<usize> {
        self.local
    }

    pub fn work_groups(&self) -> usize {
        match self.local {
            Some(local) => self.global / local,
            None => 1,
        }
    }

    pub fn is_task(&self) -> bool {
        self.local.is_none() && self.global == 1
    }
}

/// A range launch sized for a device, plus the per-work-item share of the
/// input it was sized against.
#[derive(Clone, Copy, Debug)]
pub struct RangePlan {
    pub geometry: LaunchGeometry,
    /// Contiguous input bytes each work-item owns; the union of all shares
    /// covers the whole input, possibly over-reaching at the tail (the
    /// kernel bound-checks there).
    pub bytes_per_item: usize,
}

impl RangePlan {
    /// Size a launch for `info` covering `input_len` bytes of work.
    ///
    /// Local size is the compute-unit count clamped to the device's maximum
    /// work-group size; global is `local × compute_units`, an exact multiple
    /// by construction; `bytes_per_item` is `ceil(input_len / global)`.
    pub fn for_device(info: &DeviceInfo, input_len: usize) -> Result<Self> {
        if input_len == 0 {
            return Err(DispatchError::InvalidWorkSize(
                "cannot partition an empty input".into(),
            ));
        }

        let units = info.max_compute_units.max(1) as usize;
        let local = units.min(info.max_work_group_size.max(1));
        let global = local.checked_mul(units).ok_or_else(|| {
            DispatchError::InvalidWorkSize(format!(
                "global size overflows ({local} × {units} work-items)"
            ))
        })?;
        let geometry = LaunchGeometry::linear(global, local)?;
        let bytes_per_item = input_len.div_ceil(global);

        Ok(RangePlan {
            geometry,
            bytes_per_item,
        })
    }

    /// Total bytes the launch covers; always at least the input length the
    /// plan was built for.
    pub fn covered_bytes(&self) -> usize {
        self.bytes_per_item.saturating_mul(self.geometry.global())
    }
}
