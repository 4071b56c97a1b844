//! Device aggregation
//!
//! Groups "GPU Engine" counters by the physical device they belong to and
//! reduces one sampling round to the most utilized device.

use crate::backend::{CounterHandle, PdhApi};
use crate::catalog::GPU_ENGINE_OBJECT;
use crate::error::GpuError;
use crate::pacing::Pacer;
use crate::session::{QuerySession, SessionId};
use enginescope_shared::{decode_instance, DecodedInstance, DeviceId, DeviceUsage, UsageSample};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Counter read for every engine instance
pub const UTILIZATION_COUNTER: &str = "Utilization Percentage";

/// `\GPU Engine(<instance>)\Utilization Percentage`
pub fn counter_path(instance: &str) -> String {
    format!("\\{}({})\\{}", GPU_ENGINE_OBJECT, instance, UTILIZATION_COUNTER)
}

/// Counter handles grouped by device
///
/// Devices iterate in ascending id order; each device keeps its counters in
/// enumeration order. The map remembers the session its counters were added
/// to and is never modified by sampling.
#[derive(Debug, Clone, Default)]
pub struct DeviceCounterMap {
    session: Option<SessionId>,
    engine_filter: String,
    devices: BTreeMap<DeviceId, Vec<CounterHandle>>,
}

impl DeviceCounterMap {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, device: &DeviceId) -> bool {
        self.devices.contains_key(device)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.keys()
    }

    pub fn counters(&self, device: &DeviceId) -> Option<&[CounterHandle]> {
        self.devices.get(device).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &[CounterHandle])> {
        self.devices.iter().map(|(id, counters)| (id, counters.as_slice()))
    }

    /// Total number of registered counters
    pub fn counter_count(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }

    /// Substring the instances were filtered by ("" for all engines)
    pub fn engine_filter(&self) -> &str {
        &self.engine_filter
    }

    /// Session the counters were added to
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }
}

/// Register one utilization counter per matching instance, grouped by device
///
/// Instances not containing `engine_filter` are skipped; an empty filter
/// keeps every engine type. Instances without a device LUID are skipped
/// silently. A counter that cannot be added is logged and left out; the
/// remaining instances are still processed.
pub fn build_device_counter_map<B, S>(
    session: &mut QuerySession<B>,
    instances: &[S],
    engine_filter: &str,
) -> DeviceCounterMap
where
    B: PdhApi,
    S: AsRef<str>,
{
    let mut devices: BTreeMap<DeviceId, Vec<CounterHandle>> = BTreeMap::new();
    let mut unrecognized = 0usize;
    let mut failed = 0usize;

    for name in instances {
        let name = name.as_ref();
        if !name.contains(engine_filter) {
            continue;
        }

        let DecodedInstance::Matched { device_id, .. } = decode_instance(name) else {
            debug!("Skipping instance without a device LUID: {}", name);
            unrecognized += 1;
            continue;
        };

        match session.add_counter(&counter_path(name)) {
            Ok(counter) => devices.entry(device_id).or_default().push(counter),
            Err(e) => {
                warn!("{}", e);
                failed += 1;
            }
        }
    }

    let map = DeviceCounterMap {
        session: Some(session.id()),
        engine_filter: engine_filter.to_string(),
        devices,
    };
    info!(
        "Registered {} counters across {} devices (filter {:?}, {} unrecognized, {} failed)",
        map.counter_count(),
        map.len(),
        engine_filter,
        unrecognized,
        failed
    );
    map
}

/// Remove every counter of `map` from the session's query
///
/// A map registered on another session is left alone. Counters that cannot
/// be removed are logged and stay on the query until it closes.
pub fn release_device_counter_map<B: PdhApi>(
    session: &mut QuerySession<B>,
    map: DeviceCounterMap,
) {
    if map.session != Some(session.id()) {
        if !map.is_empty() {
            warn!("Device counters belong to another session, not releasing them");
        }
        return;
    }

    let mut failed = 0usize;
    for counter in map.devices.into_values().flatten() {
        if let Err(e) = session.remove_counter(counter) {
            warn!("{}", e);
            failed += 1;
        }
    }
    debug!(
        "Released device counters, {} left on the query ({} failed)",
        session.counter_count(),
        failed
    );
}

/// Run one sampling round and return the most utilized device
///
/// Without a session or with an empty map the round is skipped and the
/// `(0, "")` sample is returned. Otherwise the session collects twice around
/// one pacer wait, then every counter of the evaluated devices is read. When
/// `target` names a device in the map only that device is evaluated; an
/// unknown target falls back to all devices. A failed read adds 0 to its
/// device.
pub fn sample_usage<B, P>(
    session: Option<&QuerySession<B>>,
    map: &DeviceCounterMap,
    target: Option<&DeviceId>,
    pacer: &P,
) -> UsageSample
where
    B: PdhApi,
    P: Pacer,
{
    let Some(session) = session else {
        debug!("No query session, skipping sample");
        return UsageSample::none();
    };
    if map.is_empty() {
        debug!("No device counters registered, skipping sample");
        return UsageSample::none();
    }
    if map.session != Some(session.id()) {
        warn!(
            "Device counters belong to another session than query {:#x}, skipping sample",
            session.handle().0
        );
        return UsageSample::none();
    }

    session.collect_paced(pacer);

    let devices = match target.and_then(|t| map.devices.get_key_value(t)) {
        Some((device_id, counters)) => vec![read_device(session, device_id, counters)],
        None => {
            if let Some(target) = target {
                debug!("Device {} not registered, evaluating all devices", target);
            }
            map.devices
                .iter()
                .map(|(device_id, counters)| read_device(session, device_id, counters))
                .collect()
        }
    };

    UsageSample::from_devices(devices)
}

fn read_device<B: PdhApi>(
    session: &QuerySession<B>,
    device_id: &DeviceId,
    counters: &[CounterHandle],
) -> DeviceUsage {
    let mut total = 0.0;
    let mut failed_reads = 0;

    for &counter in counters {
        match session.read_counter(counter) {
            Ok(value) => total += value,
            Err(failure) => {
                failed_reads += 1;
                let e = GpuError::CounterRead {
                    device: device_id.to_string(),
                    status: failure.status,
                    cstatus: failure.cstatus,
                };
                warn!("{}", e);
            }
        }
    }

    DeviceUsage {
        device_id: device_id.clone(),
        total,
        counters: counters.len(),
        failed_reads,
    }
}
