//! PDH calls through `windows-sys`

use super::{CounterHandle, PdhApi, PdhStatus, QueryHandle, ReadFailure};
use std::ptr;
use windows_sys::Win32::System::Performance::{
    PdhAddEnglishCounterW, PdhCloseQuery, PdhCollectQueryData, PdhEnumObjectItemsW,
    PdhGetFormattedCounterValue, PdhOpenQueryW, PdhRemoveCounter, PDH_FMT_COUNTERVALUE, PDH_FMT_DOUBLE,
    PDH_HCOUNTER, PDH_HQUERY, PERF_DETAIL_WIZARD,
};

/// The real-time PDH data source of the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPdh;

/// NUL-terminated UTF-16 copy of `s`
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn query_ptr(query: QueryHandle) -> PDH_HQUERY {
    query.0 as PDH_HQUERY
}

fn buffer_ptr(buf: Option<&mut [u16]>) -> *mut u16 {
    match buf {
        Some(buf) if !buf.is_empty() => buf.as_mut_ptr(),
        _ => ptr::null_mut(),
    }
}

impl PdhApi for WindowsPdh {
    fn open_query(&self) -> Result<QueryHandle, PdhStatus> {
        // SAFETY: a zeroed handle is the null handle PDH expects to fill in.
        let mut query: PDH_HQUERY = unsafe { std::mem::zeroed() };

        // SAFETY: a null data source selects real-time data and `query` is a
        // valid out pointer for the duration of the call.
        let status = unsafe { PdhOpenQueryW(ptr::null(), 0, &mut query) };
        if status != 0 {
            return Err(PdhStatus(status));
        }
        Ok(QueryHandle(query as usize))
    }

    fn close_query(&self, query: QueryHandle) -> PdhStatus {
        // SAFETY: the handle came from `open_query` and the session closes it once.
        PdhStatus(unsafe { PdhCloseQuery(query_ptr(query)) })
    }

    fn enum_object_items(
        &self,
        object: &str,
        counters: Option<&mut [u16]>,
        counters_len: &mut u32,
        instances: Option<&mut [u16]>,
        instances_len: &mut u32,
    ) -> PdhStatus {
        let object = to_wide(object);
        let counters = buffer_ptr(counters);
        let instances = buffer_ptr(instances);

        // SAFETY: `object` is NUL-terminated; each buffer pointer is either
        // null or valid for the length passed alongside it.
        let status = unsafe {
            PdhEnumObjectItemsW(
                ptr::null(),
                ptr::null(),
                object.as_ptr(),
                counters,
                counters_len,
                instances,
                instances_len,
                PERF_DETAIL_WIZARD,
                0,
            )
        };
        PdhStatus(status)
    }

    fn add_counter(&self, query: QueryHandle, path: &str) -> Result<CounterHandle, PdhStatus> {
        let path = to_wide(path);

        // SAFETY: zeroed is the null counter handle.
        let mut counter: PDH_HCOUNTER = unsafe { std::mem::zeroed() };

        // SAFETY: `path` is NUL-terminated and `counter` is a valid out pointer.
        let status =
            unsafe { PdhAddEnglishCounterW(query_ptr(query), path.as_ptr(), 0, &mut counter) };
        if status != 0 {
            return Err(PdhStatus(status));
        }
        Ok(CounterHandle(counter as usize))
    }

    fn remove_counter(&self, counter: CounterHandle) -> PdhStatus {
        // SAFETY: the counter came from `add_counter` on a query that is still
        // open, and callers drop the handle after removing it.
        PdhStatus(unsafe { PdhRemoveCounter(counter.0 as PDH_HCOUNTER) })
    }

    fn collect_query_data(&self, query: QueryHandle) -> PdhStatus {
        // SAFETY: the handle came from `open_query` and is still open.
        PdhStatus(unsafe { PdhCollectQueryData(query_ptr(query)) })
    }

    fn formatted_double(&self, counter: CounterHandle) -> Result<f64, ReadFailure> {
        // SAFETY: PDH_FMT_COUNTERVALUE is plain data; all-zero is a valid value.
        let mut value: PDH_FMT_COUNTERVALUE = unsafe { std::mem::zeroed() };

        // SAFETY: the counter belongs to an open query; `value` is a valid out
        // pointer and the type pointer may be null.
        let status = unsafe {
            PdhGetFormattedCounterValue(
                counter.0 as PDH_HCOUNTER,
                PDH_FMT_DOUBLE,
                ptr::null_mut(),
                &mut value,
            )
        };

        let status = PdhStatus(status);
        let cstatus = PdhStatus(value.CStatus);
        if !status.is_success() || !cstatus.is_valid_data() {
            return Err(ReadFailure { status, cstatus });
        }

        // SAFETY: PDH_FMT_DOUBLE was requested, so the double member is set.
        Ok(unsafe { value.Anonymous.doubleValue })
    }
}
