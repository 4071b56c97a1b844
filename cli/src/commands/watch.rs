//! Watch command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use enginescope_gpu::{GpuUsageMonitor, PdhApi, SamplerConfig};
use std::path::PathBuf;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Only count engines whose instance name contains this text (e.g. "engtype_3D")
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Report this device instead of the busiest one (e.g. 0x0000D1A7)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Time between rounds (e.g. 1s, 500ms)
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Stop after this many rounds
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Print each sample as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Sampler configuration file (TOML)
    #[arg(short, long, env = "ENGINESCOPE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl WatchArgs {
    fn sampler_config(&self) -> Result<SamplerConfig> {
        let mut config = match &self.config {
            Some(path) => SamplerConfig::load(path)?,
            None => SamplerConfig::default(),
        };

        if let Some(engine) = &self.engine {
            config.engine_filter = engine.clone();
        }
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        if let Some(interval) = &self.interval {
            config.sample_interval = interval.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

pub async fn run<B: PdhApi>(args: WatchArgs, backend: B) -> Result<()> {
    let config = args.sampler_config()?;
    let target = config.target_device()?;
    let period = config.sample_interval()?;

    let monitor =
        GpuUsageMonitor::open(backend, &config).context("Failed to open GPU Engine query")?;

    if monitor.map().is_empty() {
        output::warning("No GPU engine counters matched; samples will report 0");
    }
    if let Some(device) = &target {
        if !monitor.map().contains(device) {
            warn!("Device {} not found, reporting the busiest device", device);
        }
    }

    info!(
        "Watching {} devices every {:?} (filter {:?})",
        monitor.map().len(),
        period,
        config.engine_filter
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut rounds: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                let sample = tokio::task::block_in_place(|| monitor.sample(target.as_ref()));
                if args.json {
                    println!("{}", serde_json::to_string(&sample)?);
                } else {
                    output::usage_line(&sample);
                }

                rounds += 1;
                if args.count.is_some_and(|n| rounds >= n) {
                    break;
                }
            }
        }
    }

    monitor.close()?;
    info!("Stopped after {} rounds", rounds);
    Ok(())
}
