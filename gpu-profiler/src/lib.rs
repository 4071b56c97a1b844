//! GPU engine utilization
//!
//! Samples per-device GPU utilization from the Windows "GPU Engine"
//! performance counters. A [`QuerySession`] owns the PDH query, the
//! [`catalog`] lists engine instances, and [`aggregate`] groups their counters
//! by device and reduces each sampling round to the busiest device.

pub mod aggregate;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pacing;
pub mod session;

pub use aggregate::{
    build_device_counter_map, counter_path, release_device_counter_map, sample_usage,
    DeviceCounterMap,
};
#[cfg(windows)]
pub use backend::WindowsPdh;
pub use backend::{CounterHandle, PdhApi, PdhStatus, QueryHandle, ReadFailure};
pub use catalog::{enumerate_instances, GPU_ENGINE_OBJECT};
pub use config::SamplerConfig;
pub use error::GpuError;
pub use monitor::GpuUsageMonitor;
pub use pacing::{Pacer, ThreadSleep, MIN_COLLECT_GAP};
pub use session::{QuerySession, SessionId};
