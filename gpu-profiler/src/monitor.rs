//! One query session with its device counter map

use crate::aggregate::{
    build_device_counter_map, release_device_counter_map, sample_usage, DeviceCounterMap,
};
use crate::backend::PdhApi;
use crate::catalog::{enumerate_instances, GPU_ENGINE_OBJECT};
use crate::config::SamplerConfig;
use crate::error::GpuError;
use crate::pacing::{Pacer, ThreadSleep};
use crate::session::QuerySession;
use enginescope_shared::{DeviceId, UsageSample};
use tracing::info;

/// Samples GPU engine utilization per device
///
/// Opens a query, registers the "GPU Engine" counters matching an engine
/// filter and samples them on demand. The query is released by
/// [`GpuUsageMonitor::close`] or when the monitor is dropped.
pub struct GpuUsageMonitor<B: PdhApi, P: Pacer = ThreadSleep> {
    session: QuerySession<B>,
    map: DeviceCounterMap,
    pacer: P,
}

impl<B: PdhApi> GpuUsageMonitor<B, ThreadSleep> {
    pub fn open(backend: B, config: &SamplerConfig) -> Result<Self, GpuError> {
        let pacer = ThreadSleep::new(config.collect_gap());
        Self::with_pacer(backend, pacer, &config.engine_filter)
    }
}

impl<B: PdhApi, P: Pacer> GpuUsageMonitor<B, P> {
    pub fn with_pacer(backend: B, pacer: P, engine_filter: &str) -> Result<Self, GpuError> {
        let mut session = QuerySession::open(backend)?;
        let instances = enumerate_instances(session.backend(), GPU_ENGINE_OBJECT)?;
        let map = build_device_counter_map(&mut session, &instances, engine_filter);

        Ok(Self {
            session,
            map,
            pacer,
        })
    }

    /// Current "GPU Engine" instance names
    pub fn instances(&self) -> Result<Vec<String>, GpuError> {
        enumerate_instances(self.session.backend(), GPU_ENGINE_OBJECT)
    }

    /// Re-enumerate and register counters for a new filter
    ///
    /// The previous map's counters are removed from the query first. If
    /// enumeration fails the previous map is kept.
    pub fn rebuild(&mut self, engine_filter: &str) -> Result<&DeviceCounterMap, GpuError> {
        let instances = self.instances()?;
        release_device_counter_map(&mut self.session, std::mem::take(&mut self.map));
        self.map = build_device_counter_map(&mut self.session, &instances, engine_filter);
        info!(
            "Rebuilt device map: {} devices, {} counters on the query",
            self.map.len(),
            self.session.counter_count()
        );
        Ok(&self.map)
    }

    pub fn map(&self) -> &DeviceCounterMap {
        &self.map
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.map.device_ids()
    }

    /// One paced sampling round; `target` pins the result to one device
    pub fn sample(&self, target: Option<&DeviceId>) -> UsageSample {
        sample_usage(Some(&self.session), &self.map, target, &self.pacer)
    }

    pub fn close(self) -> Result<(), GpuError> {
        self.session.close()
    }
}
