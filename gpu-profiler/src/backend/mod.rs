//! Performance-counter capability
//!
//! Everything the sampler needs from PDH goes through [`PdhApi`]: open and
//! close a query, enumerate object items, add a counter, collect, and read a
//! formatted value. [`WindowsPdh`] calls the real API.

use std::fmt;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use self::windows::WindowsPdh;

/// A `PDH_STATUS` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PdhStatus(pub u32);

impl PdhStatus {
    pub const SUCCESS: PdhStatus = PdhStatus(0x0000_0000);
    /// Counter status: valid data that is new since the last read
    pub const CSTATUS_NEW_DATA: PdhStatus = PdhStatus(0x0000_0001);
    pub const MORE_DATA: PdhStatus = PdhStatus(0x8000_07D2);
    pub const NO_DATA: PdhStatus = PdhStatus(0x8000_07D5);
    pub const CSTATUS_NO_OBJECT: PdhStatus = PdhStatus(0xC000_0BB8);
    pub const CSTATUS_NO_COUNTER: PdhStatus = PdhStatus(0xC000_0BB9);
    pub const CSTATUS_INVALID_DATA: PdhStatus = PdhStatus(0xC000_0BBA);
    pub const INVALID_HANDLE: PdhStatus = PdhStatus(0xC000_0BBC);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Whether a counter's `CStatus` marks its value as usable
    pub fn is_valid_data(self) -> bool {
        self == Self::SUCCESS || self == Self::CSTATUS_NEW_DATA
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "ERROR_SUCCESS",
            Self::CSTATUS_NEW_DATA => "PDH_CSTATUS_NEW_DATA",
            Self::MORE_DATA => "PDH_MORE_DATA",
            Self::NO_DATA => "PDH_NO_DATA",
            Self::CSTATUS_NO_OBJECT => "PDH_CSTATUS_NO_OBJECT",
            Self::CSTATUS_NO_COUNTER => "PDH_CSTATUS_NO_COUNTER",
            Self::CSTATUS_INVALID_DATA => "PDH_CSTATUS_INVALID_DATA",
            Self::INVALID_HANDLE => "PDH_INVALID_HANDLE",
            _ => return None,
        })
    }
}

impl fmt::Display for PdhStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:08X} ({})", self.0, name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

/// Opaque query handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(pub usize);

/// Opaque counter handle, owned by the query it was added to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterHandle(pub usize);

/// Why a formatted counter read produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFailure {
    /// Status returned by the read call
    pub status: PdhStatus,
    /// `CStatus` of the returned value
    pub cstatus: PdhStatus,
}

/// The PDH calls used by the sampler
///
/// Implementations perform one blocking native call per method and report
/// the raw status; policy (retries, logging, skipping) lives in the callers.
pub trait PdhApi {
    fn open_query(&self) -> Result<QueryHandle, PdhStatus>;

    fn close_query(&self, query: QueryHandle) -> PdhStatus;

    /// `PdhEnumObjectItemsW` on the local machine
    ///
    /// Lengths are in UTF-16 code units, terminators included. Passing `None`
    /// buffers probes for the required lengths, which are written back.
    fn enum_object_items(
        &self,
        object: &str,
        counters: Option<&mut [u16]>,
        counters_len: &mut u32,
        instances: Option<&mut [u16]>,
        instances_len: &mut u32,
    ) -> PdhStatus;

    fn add_counter(&self, query: QueryHandle, path: &str) -> Result<CounterHandle, PdhStatus>;

    /// Detach a counter from its query; the handle is invalid afterwards
    fn remove_counter(&self, counter: CounterHandle) -> PdhStatus;

    fn collect_query_data(&self, query: QueryHandle) -> PdhStatus;

    /// Read the counter's current value as a double
    fn formatted_double(&self, counter: CounterHandle) -> Result<f64, ReadFailure>;
}

impl<T: PdhApi + ?Sized> PdhApi for &T {
    fn open_query(&self) -> Result<QueryHandle, PdhStatus> {
        (**self).open_query()
    }

    fn close_query(&self, query: QueryHandle) -> PdhStatus {
        (**self).close_query(query)
    }

    fn enum_object_items(
        &self,
        object: &str,
        counters: Option<&mut [u16]>,
        counters_len: &mut u32,
        instances: Option<&mut [u16]>,
        instances_len: &mut u32,
    ) -> PdhStatus {
        (**self).enum_object_items(object, counters, counters_len, instances, instances_len)
    }

    fn add_counter(&self, query: QueryHandle, path: &str) -> Result<CounterHandle, PdhStatus> {
        (**self).add_counter(query, path)
    }

    fn remove_counter(&self, counter: CounterHandle) -> PdhStatus {
        (**self).remove_counter(counter)
    }

    fn collect_query_data(&self, query: QueryHandle) -> PdhStatus {
        (**self).collect_query_data(query)
    }

    fn formatted_double(&self, counter: CounterHandle) -> Result<f64, ReadFailure> {
        (**self).formatted_double(counter)
    }
}
