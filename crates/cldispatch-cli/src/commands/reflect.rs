//! `cldispatch reflect`: reflect a 4-vector about a hyperplane on the device.
//!
//! Runs the `vector_reflect` kernel as a single task and reads the reflected
//! vector back. With the stock inputs (x = 1,2,3,4 reflected about the plane
//! normal to u = 0,5,0,0) the result is 1,-2,3,4.

use anyhow::{bail, Result};
use clap::Parser;
use cldispatch::{
    AccessMode, CompiledProgram, DeviceBuffer, DispatchConfig, DispatchContext, KernelHandle,
    LaunchGeometry, ProgramSource,
};
use std::path::PathBuf;
use tracing::info;

use crate::config::{resolve_policy, DevicePolicy};

const REFLECT_KERNEL: &str = include_str!("../kernels/reflect.cl");
const ENTRY_POINT: &str = "vector_reflect";

/// Reflect a vector about a hyperplane using a single-task kernel launch.
#[derive(Debug, Parser)]
pub struct ReflectCommand {
    /// Vector to reflect, four comma-separated floats.
    #[arg(
        long,
        value_name = "FLOATS",
        default_value = "1,2,3,4",
        allow_hyphen_values = true,
        value_parser = parse_float4
    )]
    pub x: [f32; 4],

    /// Hyperplane normal, four comma-separated floats (must be non-zero).
    #[arg(
        long,
        value_name = "FLOATS",
        default_value = "0,5,0,0",
        allow_hyphen_values = true,
        value_parser = parse_float4
    )]
    pub u: [f32; 4],

    /// Device policy; defaults to auto (GPU with CPU fallback).
    #[arg(long, value_enum)]
    pub device: Option<DevicePolicy>,

    /// Kernel source file overriding the embedded kernel.
    #[arg(long, value_name = "PATH")]
    pub kernel: Option<PathBuf>,

    /// Enable queue profiling and log the kernel execution time.
    #[arg(long)]
    pub profile: bool,
}

impl ReflectCommand {
    pub fn run(self) -> Result<()> {
        let reflected = self.compute()?;
        println!(
            "Result: {:.6} {:.6} {:.6} {:.6}",
            reflected[0], reflected[1], reflected[2], reflected[3]
        );
        Ok(())
    }

    /// Full pipeline: select device, compile, bind, launch as a task, read
    /// the reflected vector back.
    pub fn compute(&self) -> Result<[f32; 4]> {
        if self.u.iter().all(|c| *c == 0.0) {
            bail!("the hyperplane normal u must be non-zero");
        }

        let policy = resolve_policy(self.device, DevicePolicy::Auto)?;
        let ctx = DispatchContext::new(DispatchConfig {
            preference: policy.preference().to_vec(),
            profiling: self.profile,
            build_options: String::new(),
        })?;
        info!(
            device = %ctx.device_info().name,
            platform = %ctx.platform_name(),
            "selected compute device"
        );

        let source = match &self.kernel {
            Some(path) => ProgramSource::from_file(path)?,
            None => ProgramSource::from(REFLECT_KERNEL),
        };
        let program = CompiledProgram::build(&ctx, source)?;
        let kernel = KernelHandle::create(&program, ENTRY_POINT)?;

        let result = DeviceBuffer::<f32>::new_uninit(&ctx, AccessMode::WriteOnly, 4)?;
        kernel.bind_scalar(0, &self.x)?;
        kernel.bind_scalar(1, &self.u)?;
        kernel.bind_buffer(2, &result)?;

        let done = kernel.launch(ctx.queue(), LaunchGeometry::task())?;
        let host = result.read_blocking(ctx.queue(), Some(&done))?;
        if let Some(ms) = done.elapsed_ms() {
            info!(elapsed_ms = ms, "kernel execution time");
        }

        Ok([host[0], host[1], host[2], host[3]])
    }
}

fn parse_float4(raw: &str) -> Result<[f32; 4], String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected four comma-separated floats, got {} value(s)",
            parts.len()
        ));
    }
    let mut out = [0.0f32; 4];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("`{part}` is not a float"))?;
    }
    Ok(out)
}
