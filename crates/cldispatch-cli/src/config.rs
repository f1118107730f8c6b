//! Device policy resolution.
//!
//! Each command resolves the device classes it may run on from three layers:
//! an explicit `--device` flag, the `CLDISPATCH_DEVICE` environment variable,
//! and the command's own default. Earlier layers win.

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use cldispatch::{DeviceClass, CPU_ONLY, GPU_ONLY, PREFER_GPU};

/// Environment variable consulted when `--device` is absent.
pub const DEVICE_ENV: &str = "CLDISPATCH_DEVICE";

/// Which device classes a command may select, in rank order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DevicePolicy {
    /// Prefer a GPU, fall back to a CPU when no GPU exists.
    Auto,
    /// Require a GPU; fail when none is present.
    Gpu,
    /// Require a CPU; fail when none is present.
    Cpu,
}

impl DevicePolicy {
    /// The ranked preference list handed to device selection.
    pub fn preference(self) -> &'static [DeviceClass] {
        match self {
            DevicePolicy::Auto => PREFER_GPU,
            DevicePolicy::Gpu => GPU_ONLY,
            DevicePolicy::Cpu => CPU_ONLY,
        }
    }
}

/// Resolve the effective policy for one command invocation.
pub fn resolve_policy(
    flag: Option<DevicePolicy>,
    default: DevicePolicy,
) -> anyhow::Result<DevicePolicy> {
    if let Some(policy) = flag {
        return Ok(policy);
    }
    match std::env::var(DEVICE_ENV) {
        Ok(value) => DevicePolicy::from_str(&value, true).map_err(|_| {
            anyhow!("invalid {DEVICE_ENV} value `{value}` (expected auto, gpu, or cpu)")
        }),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {DEVICE_ENV}")),
    }
}
