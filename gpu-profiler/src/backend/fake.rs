//! Scripted PDH for unit tests

use super::{CounterHandle, PdhApi, PdhStatus, QueryHandle, ReadFailure};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

const COUNTER_NAMES: &[&str] = &["Running Time", "Utilization Percentage"];

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub opened: Vec<QueryHandle>,
    pub closed: Vec<QueryHandle>,
    pub enum_calls: usize,
    pub added: Vec<(QueryHandle, String)>,
    pub removed: Vec<CounterHandle>,
    pub collects: Vec<QueryHandle>,
    pub reads: Vec<CounterHandle>,
}

/// In-memory PDH: instances, readings and failures are scripted per instance name
#[derive(Debug, Default)]
pub(crate) struct FakePdh {
    pub instances: Vec<String>,
    pub open_status: Option<PdhStatus>,
    /// Hand out this value for every opened query, as the OS may after a close
    pub reused_handle: Option<QueryHandle>,
    pub probe_status: Option<PdhStatus>,
    pub fetch_status: Option<PdhStatus>,
    /// Number of fetches that report instances appearing after the probe
    pub fetch_races: RefCell<usize>,
    pub collect_status: Option<PdhStatus>,
    pub add_failures: HashSet<String>,
    pub readings: HashMap<String, Result<f64, ReadFailure>>,
    pub calls: RefCell<Calls>,
    pub counters: RefCell<HashMap<CounterHandle, String>>,
}

impl FakePdh {
    pub fn new(instances: &[&str]) -> Self {
        Self {
            instances: instances.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn reading(mut self, instance: &str, value: f64) -> Self {
        self.readings.insert(instance.to_string(), Ok(value));
        self
    }

    pub fn failed_read(mut self, instance: &str) -> Self {
        self.readings.insert(
            instance.to_string(),
            Err(ReadFailure {
                status: PdhStatus::SUCCESS,
                cstatus: PdhStatus::CSTATUS_INVALID_DATA,
            }),
        );
        self
    }

    pub fn failed_add(mut self, instance: &str) -> Self {
        self.add_failures.insert(instance.to_string());
        self
    }

    fn multi_sz(items: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<u16> {
        let mut buf = Vec::new();
        for item in items {
            buf.extend(item.as_ref().encode_utf16());
            buf.push(0);
        }
        buf.push(0);
        buf
    }

    fn instance_of(path: &str) -> Option<&str> {
        let start = path.find('(')? + 1;
        let end = path.rfind(")\\")?;
        path.get(start..end)
    }
}

impl PdhApi for FakePdh {
    fn open_query(&self) -> Result<QueryHandle, PdhStatus> {
        if let Some(status) = self.open_status {
            return Err(status);
        }
        let mut calls = self.calls.borrow_mut();
        let handle = self
            .reused_handle
            .unwrap_or(QueryHandle(0x1000 + calls.opened.len()));
        calls.opened.push(handle);
        Ok(handle)
    }

    fn close_query(&self, query: QueryHandle) -> PdhStatus {
        self.calls.borrow_mut().closed.push(query);
        PdhStatus::SUCCESS
    }

    fn enum_object_items(
        &self,
        _object: &str,
        counters: Option<&mut [u16]>,
        counters_len: &mut u32,
        instances: Option<&mut [u16]>,
        instances_len: &mut u32,
    ) -> PdhStatus {
        self.calls.borrow_mut().enum_calls += 1;

        let counter_blob = Self::multi_sz(COUNTER_NAMES);
        let instance_blob = if self.instances.is_empty() {
            Vec::new()
        } else {
            Self::multi_sz(&self.instances)
        };

        let (Some(counters), Some(instances)) = (counters, instances) else {
            *counters_len = counter_blob.len() as u32;
            *instances_len = instance_blob.len() as u32;
            return match self.probe_status {
                Some(status) => status,
                None if instance_blob.is_empty() => PdhStatus::SUCCESS,
                None => PdhStatus::MORE_DATA,
            };
        };

        if let Some(status) = self.fetch_status {
            return status;
        }
        let mut races = self.fetch_races.borrow_mut();
        if *races > 0 {
            *races -= 1;
            *instances_len = instance_blob.len() as u32 + 16;
            return PdhStatus::MORE_DATA;
        }
        if counters.len() < counter_blob.len() || instances.len() < instance_blob.len() {
            return PdhStatus::MORE_DATA;
        }

        counters[..counter_blob.len()].copy_from_slice(&counter_blob);
        instances[..instance_blob.len()].copy_from_slice(&instance_blob);
        *counters_len = counter_blob.len() as u32;
        *instances_len = instance_blob.len() as u32;
        PdhStatus::SUCCESS
    }

    fn add_counter(&self, query: QueryHandle, path: &str) -> Result<CounterHandle, PdhStatus> {
        let instance = Self::instance_of(path).unwrap_or_default();
        if self.add_failures.contains(instance) {
            return Err(PdhStatus::CSTATUS_NO_COUNTER);
        }

        let mut calls = self.calls.borrow_mut();
        calls.added.push((query, path.to_string()));
        let handle = CounterHandle(calls.added.len());
        self.counters.borrow_mut().insert(handle, instance.to_string());
        Ok(handle)
    }

    fn remove_counter(&self, counter: CounterHandle) -> PdhStatus {
        self.calls.borrow_mut().removed.push(counter);
        match self.counters.borrow_mut().remove(&counter) {
            Some(_) => PdhStatus::SUCCESS,
            None => PdhStatus::INVALID_HANDLE,
        }
    }

    fn collect_query_data(&self, query: QueryHandle) -> PdhStatus {
        self.calls.borrow_mut().collects.push(query);
        self.collect_status.unwrap_or(PdhStatus::SUCCESS)
    }

    fn formatted_double(&self, counter: CounterHandle) -> Result<f64, ReadFailure> {
        self.calls.borrow_mut().reads.push(counter);
        let counters = self.counters.borrow();
        let Some(instance) = counters.get(&counter) else {
            return Err(ReadFailure {
                status: PdhStatus::INVALID_HANDLE,
                cstatus: PdhStatus::SUCCESS,
            });
        };
        self.readings.get(instance).copied().unwrap_or(Ok(0.0))
    }
}
