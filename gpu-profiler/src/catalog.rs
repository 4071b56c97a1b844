//! Instance catalog
//!
//! Lists the counter instances PDH exposes for an object. Independent of any
//! query: the names are fetched with a probe call that reports buffer sizes
//! followed by a fetch into buffers of that size.

use crate::backend::{PdhApi, PdhStatus};
use crate::error::GpuError;
use tracing::{debug, warn};

/// Performance object holding one instance per GPU engine
pub const GPU_ENGINE_OBJECT: &str = "GPU Engine";

/// Probe/fetch rounds tried when instances appear between the two calls
const MAX_ENUM_ATTEMPTS: usize = 3;

/// Enumerate the instance names of `object`
///
/// An object without instances yields an empty list, which is a valid outcome
/// (no GPU engines exposed) and not an error.
pub fn enumerate_instances<B: PdhApi>(backend: &B, object: &str) -> Result<Vec<String>, GpuError> {
    let failed = |status: PdhStatus| GpuError::Enumeration {
        object: object.to_string(),
        status,
    };

    for attempt in 1..=MAX_ENUM_ATTEMPTS {
        let mut counters_len = 0u32;
        let mut instances_len = 0u32;
        let status =
            backend.enum_object_items(object, None, &mut counters_len, None, &mut instances_len);
        if status != PdhStatus::SUCCESS && status != PdhStatus::MORE_DATA {
            return Err(failed(status));
        }

        if instances_len == 0 {
            debug!("{:?} exposes no instances", object);
            return Ok(Vec::new());
        }

        let mut counters = vec![0u16; counters_len as usize];
        let mut instances = vec![0u16; instances_len as usize];
        let status = backend.enum_object_items(
            object,
            Some(counters.as_mut_slice()),
            &mut counters_len,
            Some(instances.as_mut_slice()),
            &mut instances_len,
        );

        if status == PdhStatus::MORE_DATA {
            warn!(
                "{:?} instances changed between probe and fetch (attempt {}/{})",
                object, attempt, MAX_ENUM_ATTEMPTS
            );
            continue;
        }
        if !status.is_success() {
            return Err(failed(status));
        }

        let len = (instances_len as usize).min(instances.len());
        let names = decode_multi_sz(&instances[..len]);
        debug!("Enumerated {} {:?} instances", names.len(), object);
        return Ok(names);
    }

    Err(failed(PdhStatus::MORE_DATA))
}

/// Split a double-NUL terminated UTF-16 list, dropping empty fragments
pub fn decode_multi_sz(buf: &[u16]) -> Vec<String> {
    buf.split(|&unit| unit == 0)
        .filter(|item| !item.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}
