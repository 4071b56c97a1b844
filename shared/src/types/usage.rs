//! Utilization samples produced by one sampling round

use crate::types::instance::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summed utilization of one device for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUsage {
    pub device_id: DeviceId,

    /// Sum of every engine counter of the device; may exceed 100
    pub total: f64,

    /// Number of counters read for this device
    pub counters: usize,

    /// Counters whose read failed and contributed 0
    pub failed_reads: usize,
}

/// Result of one sampling round
///
/// `percent` and `device_id` describe the most utilized device. A sample with
/// `percent == 0` and an empty `device_id` means there was nothing to report
/// and is not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub percent: u32,
    pub device_id: String,

    /// Per-device totals of the evaluated devices, in device-id order
    #[serde(default)]
    pub devices: Vec<DeviceUsage>,

    pub taken_at: DateTime<Utc>,
}

impl UsageSample {
    /// The `(0, "")` sample
    pub fn none() -> Self {
        Self {
            percent: 0,
            device_id: String::new(),
            devices: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    /// Reduce per-device totals to the maximum
    ///
    /// Only a strictly greater total replaces the current best, so with
    /// `devices` in ascending id order a tie goes to the smallest id. The
    /// total is truncated toward zero.
    pub fn from_devices(devices: Vec<DeviceUsage>) -> Self {
        let mut best: Option<usize> = None;
        for (idx, usage) in devices.iter().enumerate() {
            if best.map_or(true, |b| usage.total > devices[b].total) {
                best = Some(idx);
            }
        }

        let Some(idx) = best else {
            return Self::none();
        };

        Self {
            percent: devices[idx].total.trunc() as u32,
            device_id: devices[idx].device_id.to_string(),
            devices,
            taken_at: Utc::now(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.percent == 0 && self.device_id.is_empty()
    }

    /// The `(percent, device id)` pair
    pub fn as_pair(&self) -> (u32, &str) {
        (self.percent, &self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(id: &str, total: f64) -> DeviceUsage {
        DeviceUsage {
            device_id: id.parse().unwrap(),
            total,
            counters: 1,
            failed_reads: 0,
        }
    }

    #[test]
    fn test_none_sample() {
        let sample = UsageSample::none();
        assert_eq!(sample.as_pair(), (0, ""));
        assert!(sample.is_none());
        assert!(sample.devices.is_empty());
    }

    #[test]
    fn test_max_device_selected() {
        let sample = UsageSample::from_devices(vec![usage("0xA", 25.0), usage("0xB", 50.0)]);
        assert_eq!(sample.as_pair(), (50, "0xB"));
        assert_eq!(sample.devices.len(), 2);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let sample = UsageSample::from_devices(vec![usage("0xA", 99.99)]);
        assert_eq!(sample.percent, 99);

        let sample = UsageSample::from_devices(vec![usage("0xA", 187.6)]);
        assert_eq!(sample.percent, 187);
    }

    #[test]
    fn test_tie_keeps_first_device() {
        let sample = UsageSample::from_devices(vec![usage("0xA", 40.0), usage("0xB", 40.0)]);
        assert_eq!(sample.device_id, "0xA");
    }

    #[test]
    fn test_idle_device_still_reported() {
        let sample = UsageSample::from_devices(vec![usage("0xA", 0.0)]);
        assert_eq!(sample.as_pair(), (0, "0xA"));
        assert!(!sample.is_none());
    }

    #[test]
    fn test_empty_devices_is_none() {
        assert!(UsageSample::from_devices(Vec::new()).is_none());
    }

    #[test]
    fn test_sample_serializes_device_ids_as_strings() {
        let sample = UsageSample::from_devices(vec![usage("0x0000D1A5", 12.5)]);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["device_id"], "0x0000D1A5");
        assert_eq!(json["devices"][0]["device_id"], "0x0000D1A5");
        assert_eq!(json["percent"], 12);
    }
}
