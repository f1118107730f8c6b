//! `cldispatch probe`: enumerate OpenCL platforms and devices.

use anyhow::Result;
use clap::Parser;
use cldispatch::{probe_devices, PlatformReport};

/// List every OpenCL platform and device visible to this process.
#[derive(Debug, Parser)]
pub struct ProbeCommand {
    /// Emit the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl ProbeCommand {
    pub fn run(self) -> Result<()> {
        let reports = probe_devices();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
            return Ok(());
        }
        print!("{}", render_text(&reports));
        Ok(())
    }
}

fn render_text(reports: &[PlatformReport]) -> String {
    use std::fmt::Write;

    if reports.is_empty() {
        return "no OpenCL platforms found\n".to_string();
    }
    let mut out = String::new();
    for (p, platform) in reports.iter().enumerate() {
        let _ = writeln!(out, "Platform {p}: {} ({})", platform.name, platform.vendor);
        if platform.devices.is_empty() {
            let _ = writeln!(out, "  no devices");
            continue;
        }
        for (d, device) in platform.devices.iter().enumerate() {
            let _ = writeln!(out, "  Device {d}: {} [{}]", device.name, device.class);
            let _ = writeln!(out, "    vendor:          {}", device.vendor);
            let _ = writeln!(out, "    compute units:   {}", device.max_compute_units);
            let _ = writeln!(out, "    max work-group:  {}", device.max_work_group_size);
            let _ = writeln!(
                out,
                "    global memory:   {} MiB",
                device.global_mem_size / (1024 * 1024)
            );
        }
    }
    out
}
