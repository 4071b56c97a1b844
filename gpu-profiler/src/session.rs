//! Query session
//!
//! Owns one PDH query handle from open to close. Counters added through the
//! session belong to it and become invalid once it closes. A session that is
//! dropped without [`QuerySession::close`] is closed by `Drop`, so error paths
//! never leak the native handle.
//!
//! Each session also carries a [`SessionId`] that is never reused within the
//! process, unlike the native handle value, so counters can be tied to the
//! session that owns them.

use crate::backend::{CounterHandle, PdhApi, QueryHandle, ReadFailure};
use crate::error::GpuError;
use crate::pacing::Pacer;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one opened session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct QuerySession<B: PdhApi> {
    backend: B,
    handle: QueryHandle,
    id: SessionId,
    counters: usize,
    open: bool,
}

impl<B: PdhApi> QuerySession<B> {
    /// Open a real-time query. No retries.
    pub fn open(backend: B) -> Result<Self, GpuError> {
        let handle = backend
            .open_query()
            .map_err(|status| GpuError::QueryOpen { status })?;
        debug!("Opened PDH query {:#x}", handle.0);

        Ok(Self {
            backend,
            handle,
            id: SessionId::next(),
            counters: 0,
            open: true,
        })
    }

    pub fn handle(&self) -> QueryHandle {
        self.handle
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of counters registered on this query
    pub fn counter_count(&self) -> usize {
        self.counters
    }

    pub(crate) fn add_counter(&mut self, path: &str) -> Result<CounterHandle, GpuError> {
        let counter = self
            .backend
            .add_counter(self.handle, path)
            .map_err(|status| GpuError::CounterAdd {
                path: path.to_string(),
                status,
            })?;
        self.counters += 1;
        Ok(counter)
    }

    pub(crate) fn remove_counter(&mut self, counter: CounterHandle) -> Result<(), GpuError> {
        let status = self.backend.remove_counter(counter);
        if !status.is_success() {
            return Err(GpuError::CounterRemove {
                counter: counter.0,
                status,
            });
        }
        self.counters = self.counters.saturating_sub(1);
        Ok(())
    }

    /// One data refresh
    ///
    /// A failed refresh is logged only; the counter reads that follow report
    /// their own invalid status.
    pub fn collect_tick(&self) {
        let status = self.backend.collect_query_data(self.handle);
        if !status.is_success() {
            warn!("PdhCollectQueryData failed on query {:#x}: {}", self.handle.0, status);
        }
    }

    /// Two refreshes separated by the pacer's wait
    pub fn collect_paced<P: Pacer>(&self, pacer: &P) {
        self.collect_tick();
        pacer.pause();
        self.collect_tick();
    }

    pub(crate) fn read_counter(&self, counter: CounterHandle) -> Result<f64, ReadFailure> {
        self.backend.formatted_double(counter)
    }

    /// Release the query and every counter added to it
    pub fn close(mut self) -> Result<(), GpuError> {
        self.open = false;
        let status = self.backend.close_query(self.handle);
        if !status.is_success() {
            return Err(GpuError::QueryClose { status });
        }
        debug!("Closed PDH query {:#x}", self.handle.0);
        Ok(())
    }
}

impl<B: PdhApi> Drop for QuerySession<B> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let status = self.backend.close_query(self.handle);
        if status.is_success() {
            debug!("Closed PDH query {:#x} on drop", self.handle.0);
        } else {
            warn!("Failed to close PDH query {:#x} on drop: {}", self.handle.0, status);
        }
    }
}
