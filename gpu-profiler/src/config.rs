//! Sampler configuration

use crate::pacing::MIN_COLLECT_GAP;
use anyhow::{Context, Result};
use enginescope_shared::utils::parse_duration;
use enginescope_shared::DeviceId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Substring an instance name must contain, e.g. "engtype_3D" ("" = all engines)
    pub engine_filter: String,

    /// Device to pin sampling to (None = report the most utilized device)
    pub device: Option<String>,

    /// Gap between the two collects of one round, in milliseconds
    pub collect_gap_ms: u64,

    /// Time between the starts of consecutive rounds (e.g. "1s", "500ms")
    pub sample_interval: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            engine_filter: std::env::var("ENGINESCOPE_ENGINE_FILTER").unwrap_or_default(),
            device: std::env::var("ENGINESCOPE_DEVICE").ok(),
            collect_gap_ms: std::env::var("ENGINESCOPE_COLLECT_GAP_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MIN_COLLECT_GAP.as_millis() as u64),
            sample_interval: std::env::var("ENGINESCOPE_SAMPLE_INTERVAL")
                .unwrap_or_else(|_| "1s".to_string()),
        }
    }
}

impl SamplerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Invalid sampler configuration")
    }

    /// Load a TOML file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn collect_gap(&self) -> Duration {
        Duration::from_millis(self.collect_gap_ms)
    }

    pub fn sample_interval(&self) -> Result<Duration> {
        parse_duration(&self.sample_interval)
            .with_context(|| format!("Invalid sample interval: {:?}", self.sample_interval))
    }

    pub fn target_device(&self) -> Result<Option<DeviceId>> {
        self.device
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| d.parse::<DeviceId>().context("Invalid device id"))
            .transpose()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.collect_gap() < MIN_COLLECT_GAP {
            anyhow::bail!(
                "Collect gap must be at least {} ms",
                MIN_COLLECT_GAP.as_millis()
            );
        }

        if self.sample_interval()? <= self.collect_gap() {
            anyhow::bail!("Sample interval must be longer than the collect gap");
        }

        self.target_device()?;
        Ok(())
    }
}
