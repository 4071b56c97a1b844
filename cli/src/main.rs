//! CLI for enginescope
//!
//! Reports GPU engine utilization from Windows performance counters:
//! - instances: List raw "GPU Engine" counter instances
//! - devices: List the devices found and their counters
//! - watch: Sample utilization on an interval

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg_attr(not(windows), allow(dead_code))]
mod commands;
#[cfg_attr(not(windows), allow(dead_code))]
mod output;

#[derive(Parser)]
#[command(name = "enginescope")]
#[command(about = "enginescope - per-device GPU engine utilization", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List "GPU Engine" counter instances
    Instances(commands::instances::InstancesArgs),

    /// List GPU devices and their engine counters
    Devices(commands::devices::DevicesArgs),

    /// Sample GPU utilization on an interval
    Watch(commands::watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    #[cfg(windows)]
    {
        let backend = enginescope_gpu::WindowsPdh;
        match cli.command {
            Commands::Instances(args) => commands::instances::run(args, backend).await,
            Commands::Devices(args) => commands::devices::run(args, backend).await,
            Commands::Watch(args) => commands::watch::run(args, backend).await,
        }
    }

    #[cfg(not(windows))]
    {
        let _ = cli;
        Err(enginescope_gpu::GpuError::Unsupported.into())
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
