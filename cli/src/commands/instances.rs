//! Instances command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use enginescope_gpu::{enumerate_instances, PdhApi, GPU_ENGINE_OBJECT};
use enginescope_shared::{decode_instance, DecodedInstance};

#[derive(Args, Debug)]
pub struct InstancesArgs {
    /// Only list instances whose name contains this text
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Print bare instance names, one per line
    #[arg(long)]
    pub raw: bool,
}

pub async fn run<B: PdhApi>(args: InstancesArgs, backend: B) -> Result<()> {
    let instances = enumerate_instances(&backend, GPU_ENGINE_OBJECT)
        .context("Failed to enumerate GPU Engine instances")?;

    let selected: Vec<&String> = instances
        .iter()
        .filter(|name| name.contains(&args.filter))
        .collect();

    if args.raw {
        for name in &selected {
            println!("{}", name);
        }
        return Ok(());
    }

    if selected.is_empty() {
        output::warning("No GPU Engine instances found");
        return Ok(());
    }

    println!("{:<12} {:<16} INSTANCE", "DEVICE", "ENGINE");
    println!("{}", "-".repeat(80));
    for name in &selected {
        match decode_instance(name) {
            DecodedInstance::Matched {
                device_id,
                engine_type,
            } => println!(
                "{:<12} {:<16} {}",
                device_id,
                engine_type.as_deref().unwrap_or("-"),
                name
            ),
            DecodedInstance::Unrecognized => println!("{:<12} {:<16} {}", "?", "-", name),
        }
    }

    output::info(&format!(
        "{} of {} instances listed",
        selected.len(),
        instances.len()
    ));
    Ok(())
}
