//! OpenCL platform and device discovery.
//!
//! Two entry points: [`probe_devices`] enumerates everything it can see and
//! never fails (missing runtimes degrade to an empty report), while
//! [`select_device`] walks a ranked list of device classes and picks the
//! first match for a pipeline run.

use crate::error::{DispatchError, Result};
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
    CL_DEVICE_TYPE_CUSTOM, CL_DEVICE_TYPE_GPU,
};
use opencl3::error_codes::{ClError, CL_DEVICE_NOT_FOUND};
use opencl3::platform::{get_platforms, Platform};
use opencl3::types::{cl_device_id, cl_device_type};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Broad class of a compute device, in the sense of the OpenCL device type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Gpu,
    Cpu,
    Accelerator,
    /// Anything that reports none of the three types above.
    Custom,
}

impl DeviceClass {
    fn as_cl_type(self) -> cl_device_type {
        match self {
            DeviceClass::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceClass::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceClass::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
            DeviceClass::Custom => CL_DEVICE_TYPE_CUSTOM,
        }
    }

    /// Classify a raw device type bitfield. GPU wins over CPU for hybrid
    /// devices that set both bits.
    pub fn from_cl_type(raw: cl_device_type) -> DeviceClass {
        if raw & CL_DEVICE_TYPE_GPU != 0 {
            DeviceClass::Gpu
        } else if raw & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::Cpu
        } else if raw & CL_DEVICE_TYPE_ACCELERATOR != 0 {
            DeviceClass::Accelerator
        } else {
            DeviceClass::Custom
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Gpu => "gpu",
            DeviceClass::Cpu => "cpu",
            DeviceClass::Accelerator => "accelerator",
            DeviceClass::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Prefer a GPU, fall back to a CPU device.
pub const PREFER_GPU: &[DeviceClass] = &[DeviceClass::Gpu, DeviceClass::Cpu];

/// Require a GPU; fail rather than fall back.
pub const GPU_ONLY: &[DeviceClass] = &[DeviceClass::Gpu];

/// Require a CPU device.
pub const CPU_ONLY: &[DeviceClass] = &[DeviceClass::Cpu];

/// Capability snapshot of one device, cached at discovery time so later
/// stages never re-query the backend.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub class: DeviceClass,
    pub max_compute_units: u32,
    pub max_work_group_size: usize,
    pub global_mem_size: u64,
}

impl DeviceInfo {
    fn query(device: &Device, class: DeviceClass) -> DeviceInfo {
        DeviceInfo {
            name: device.name().unwrap_or_default().trim().to_string(),
            vendor: device.vendor().unwrap_or_default().trim().to_string(),
            class,
            max_compute_units: device.max_compute_units().unwrap_or(1),
            max_work_group_size: device.max_work_group_size().unwrap_or(1),
            global_mem_size: device.global_mem_size().unwrap_or(0),
        }
    }
}

/// One platform and every device it exposes.
#[derive(Clone, Debug, Serialize)]
pub struct PlatformReport {
    pub name: String,
    pub vendor: String,
    pub devices: Vec<DeviceInfo>,
}

/// The device chosen for a pipeline run, with its cached capabilities.
pub struct SelectedDevice {
    device: Device,
    info: DeviceInfo,
    platform_name: String,
}

impl SelectedDevice {
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn id(&self) -> cl_device_id {
        self.device.id()
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }
}

// Manual impl: opencl3's Device does not implement Debug.
impl fmt::Debug for SelectedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedDevice")
            .field("platform", &self.platform_name)
            .field("info", &self.info)
            .finish()
    }
}

/// Enumerate every platform and device visible to the OpenCL runtime.
///
/// Never fails: a missing or broken runtime yields an empty report, matching
/// how an informational probe should behave on machines without compute
/// hardware.
pub fn probe_devices() -> Vec<PlatformReport> {
    let platforms = get_platforms().unwrap_or_default();
    let mut reports = Vec::with_capacity(platforms.len());
    for platform in &platforms {
        let name = platform_name(platform);
        let ids = platform.get_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();
        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            let device = Device::new(id);
            let class = DeviceClass::from_cl_type(device.dev_type().unwrap_or(0));
            let info = DeviceInfo::query(&device, class);
            debug!(platform = %name, device = %info.name, class = %class, "probed device");
            devices.push(info);
        }
        reports.push(PlatformReport {
            name,
            vendor: platform.vendor().unwrap_or_default().trim().to_string(),
            devices,
        });
    }
    reports
}

/// Select one device by walking `preference` in rank order.
///
/// For each class, platforms are scanned in enumeration order and the first
/// device of that class wins. A class that is simply absent
/// (`CL_DEVICE_NOT_FOUND` or an empty id list) moves selection on to the
/// next rank; any other backend error aborts selection immediately.
pub fn select_device(preference: &[DeviceClass]) -> Result<SelectedDevice> {
    let platforms = get_platforms().map_err(|_| DispatchError::NoPlatform)?;
    if platforms.is_empty() {
        return Err(DispatchError::NoPlatform);
    }

    for &class in preference {
        for platform in &platforms {
            let ids = match platform.get_devices(class.as_cl_type()) {
                Ok(ids) => ids,
                Err(ClError(CL_DEVICE_NOT_FOUND)) => continue,
                Err(code) => return Err(DispatchError::DeviceEnumeration(code)),
            };
            if let Some(&id) = ids.first() {
                let device = Device::new(id);
                let info = DeviceInfo::query(&device, class);
                let platform_name = platform_name(platform);
                info!(
                    platform = %platform_name,
                    device = %info.name,
                    class = %class,
                    compute_units = info.max_compute_units,
                    "selected compute device"
                );
                return Ok(SelectedDevice {
                    device,
                    info,
                    platform_name,
                });
            }
        }
        debug!(class = %class, "no device of this class, trying next preference");
    }

    Err(DispatchError::NoDevice {
        searched: join_classes(preference),
    })
}

fn platform_name(platform: &Platform) -> String {
    platform.name().unwrap_or_default().trim().to_string()
}

fn join_classes(classes: &[DeviceClass]) -> String {
    classes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── classification ──────────────────────────────────────────────

    #[test]
    fn gpu_bit_classifies_as_gpu() {
        assert_eq!(
            DeviceClass::from_cl_type(CL_DEVICE_TYPE_GPU),
            DeviceClass::Gpu
        );
    }

    #[test]
    fn hybrid_gpu_cpu_prefers_gpu() {
        let raw = CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_CPU;
        assert_eq!(DeviceClass::from_cl_type(raw), DeviceClass::Gpu);
    }

    #[test]
    fn accelerator_bit_classifies_as_accelerator() {
        assert_eq!(
            DeviceClass::from_cl_type(CL_DEVICE_TYPE_ACCELERATOR),
            DeviceClass::Accelerator
        );
    }

    #[test]
    fn unknown_bits_classify_as_custom() {
        assert_eq!(DeviceClass::from_cl_type(0), DeviceClass::Custom);
    }

    #[test]
    fn search_types_round_trip_through_classification() {
        // Selection stores the class it searched for, so every class must
        // search a device type that classifies back to itself.
        for class in [
            DeviceClass::Gpu,
            DeviceClass::Cpu,
            DeviceClass::Accelerator,
            DeviceClass::Custom,
        ] {
            assert_eq!(DeviceClass::from_cl_type(class.as_cl_type()), class);
        }
    }

    #[test]
    fn class_display_names() {
        assert_eq!(DeviceClass::Gpu.to_string(), "gpu");
        assert_eq!(DeviceClass::Cpu.to_string(), "cpu");
        assert_eq!(DeviceClass::Accelerator.to_string(), "accelerator");
        assert_eq!(DeviceClass::Custom.to_string(), "custom");
    }

    // ── preference presets ──────────────────────────────────────────

    #[test]
    fn prefer_gpu_ranks_gpu_before_cpu() {
        assert_eq!(PREFER_GPU, &[DeviceClass::Gpu, DeviceClass::Cpu]);
    }

    #[test]
    fn gpu_only_has_no_fallback() {
        assert_eq!(GPU_ONLY, &[DeviceClass::Gpu]);
        assert_eq!(CPU_ONLY, &[DeviceClass::Cpu]);
    }

    #[test]
    fn searched_classes_join_with_commas() {
        assert_eq!(join_classes(PREFER_GPU), "gpu, cpu");
        assert_eq!(join_classes(&[]), "");
    }

    // ── discovery without assuming hardware ─────────────────────────

    #[test]
    fn probe_is_graceful_without_a_runtime() {
        // Must not panic whether or not an OpenCL runtime is installed.
        let reports = probe_devices();
        for report in &reports {
            for device in &report.devices {
                assert!(device.max_compute_units >= 1);
                assert!(device.max_work_group_size >= 1);
            }
        }
    }

    #[test]
    fn empty_preference_never_selects() {
        match select_device(&[]) {
            Err(DispatchError::NoPlatform) => {}
            Err(DispatchError::NoDevice { searched }) => assert!(searched.is_empty()),
            Ok(selected) => panic!("selected {:?} from an empty preference", selected),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
