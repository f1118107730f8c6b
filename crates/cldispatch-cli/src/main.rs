//! `cldispatch` binary entry point.

use clap::{Parser, Subcommand};
use cldispatch::DispatchError;
use cldispatch_cli::commands::{ProbeCommand, ReflectCommand, SearchCommand};
use tracing::error;

#[derive(Debug, Parser)]
#[command(
    name = "cldispatch",
    version,
    about = "OpenCL compute dispatch demos: probe devices, reflect vectors, count words"
)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List OpenCL platforms and devices.
    Probe(ProbeCommand),
    /// Reflect a vector about a hyperplane on the device.
    Reflect(ReflectCommand),
    /// Count keyword occurrences in a text file on the device.
    Search(SearchCommand),
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Probe(cmd) => cmd.run(),
        Commands::Reflect(cmd) => cmd.run(),
        Commands::Search(cmd) => cmd.run(),
    };

    if let Err(err) = result {
        report_failure(&err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins when set; otherwise the `--log-level` flag applies.
/// Diagnostics go to stderr so stdout carries only command output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// A failed kernel build puts the compiler log verbatim on stdout, where the
/// caller can capture it; every other failure is a stderr line per cause.
fn report_failure(err: &anyhow::Error) {
    let dispatch_failure = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<DispatchError>());
    if let Some(DispatchError::BuildFailed { log }) = dispatch_failure {
        println!("{log}");
        error!("kernel build failed; compiler log written to stdout");
        return;
    }
    error!("command failed: {err}");
    for cause in err.chain().skip(1) {
        error!("  caused by: {cause}");
    }
}
