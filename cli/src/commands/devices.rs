//! Devices command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use enginescope_gpu::{GpuUsageMonitor, PdhApi, SamplerConfig};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Only count engines whose instance name contains this text (e.g. "engtype_3D")
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Take one sampling round and show each device's total
    #[arg(short, long)]
    pub sample: bool,

    /// Print the device list as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DeviceRow {
    device_id: String,
    counters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<f64>,
}

pub async fn run<B: PdhApi>(args: DevicesArgs, backend: B) -> Result<()> {
    let mut config = SamplerConfig::default();
    if let Some(engine) = args.engine {
        config.engine_filter = engine;
    }

    let monitor =
        GpuUsageMonitor::open(backend, &config).context("Failed to open GPU Engine query")?;

    let sample = if args.sample {
        Some(tokio::task::block_in_place(|| monitor.sample(None)))
    } else {
        None
    };

    let rows: Vec<DeviceRow> = monitor
        .map()
        .iter()
        .map(|(id, counters)| DeviceRow {
            device_id: id.to_string(),
            counters: counters.len(),
            total: sample.as_ref().and_then(|s| {
                s.devices
                    .iter()
                    .find(|d| &d.device_id == id)
                    .map(|d| d.total)
            }),
        })
        .collect();

    monitor.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::warning("No GPU devices found");
        return Ok(());
    }

    println!("{:<12} {:>8} {:>10}", "DEVICE", "COUNTERS", "TOTAL");
    println!("{}", "-".repeat(32));
    for row in &rows {
        let total = row
            .total
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<12} {:>8} {:>10}", row.device_id, row.counters, total);
    }

    if let Some(sample) = &sample {
        if !sample.is_none() {
            output::success(&format!(
                "Busiest device: {} at {}%",
                sample.device_id, sample.percent
            ));
        }
    }
    Ok(())
}
