//! Execution context: one device, one context, one in-order queue.

use crate::device::{select_device, DeviceClass, DeviceInfo, SelectedDevice, PREFER_GPU};
use crate::error::{DispatchError, Result};
use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::types::cl_device_id;
use std::fmt;
use tracing::debug;

/// Configuration for one pipeline run.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Device classes to try, in rank order.
    pub preference: Vec<DeviceClass>,
    /// Create the queue with `CL_QUEUE_PROFILING_ENABLE` so launch events
    /// carry execution timestamps.
    pub profiling: bool,
    /// Options passed verbatim to the kernel compiler (e.g. `-Werror`).
    pub build_options: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            preference: PREFER_GPU.to_vec(),
            profiling: false,
            build_options: String::new(),
        }
    }
}

/// Owns the selected device, its context, and the single in-order command
/// queue every launch and transfer goes through.
pub struct DispatchContext {
    // Declaration order is drop order: the queue must release before the
    // context that owns it.
    queue: CommandQueue,
    context: Context,
    device: SelectedDevice,
    profiling: bool,
    build_options: String,
}

impl DispatchContext {
    /// Select a device per `config.preference` and stand up the context and
    /// queue. Single attempt; any backend rejection is fatal to the run.
    pub fn new(config: DispatchConfig) -> Result<Self> {
        let device = select_device(&config.preference)?;

        let context =
            Context::from_device(device.device()).map_err(DispatchError::ContextCreation)?;

        let properties = if config.profiling {
            CL_QUEUE_PROFILING_ENABLE
        } else {
            0
        };
        // The OpenCL 1.2 queue API: 2.0's create-with-properties is missing
        // from several runtimes this targets (notably macOS).
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, properties)
            .map_err(DispatchError::QueueCreation)?;

        debug!(
            device = %device.info().name,
            profiling = config.profiling,
            "dispatch context ready"
        );

        Ok(DispatchContext {
            queue,
            context,
            device,
            profiling: config.profiling,
            build_options: config.build_options,
        })
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.device.info()
    }

    pub fn platform_name(&self) -> &str {
        self.device.platform_name()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn profiling(&self) -> bool {
        self.profiling
    }

    pub fn build_options(&self) -> &str {
        &self.build_options
    }

    pub(crate) fn device_id(&self) -> cl_device_id {
        self.device.id()
    }
}

// Manual impl: opencl3's Context and CommandQueue do not implement Debug.
impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("device", self.device.info())
            .field("profiling", &self.profiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_prefers_gpu_then_cpu() {
        let config = DispatchConfig::default();
        assert_eq!(config.preference, PREFER_GPU);
        assert!(!config.profiling);
        assert!(config.build_options.is_empty());
    }
}
