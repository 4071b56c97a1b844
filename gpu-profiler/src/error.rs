//! Sampler errors

use crate::backend::PdhStatus;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// No query could be opened; nothing else can proceed
    #[error("Failed to open PDH query: {status}")]
    QueryOpen { status: PdhStatus },

    #[error("Failed to close PDH query: {status}")]
    QueryClose { status: PdhStatus },

    /// Enumeration failed; distinct from an object with zero instances
    #[error("Failed to enumerate {object:?} instances: {status}")]
    Enumeration { object: String, status: PdhStatus },

    /// One instance could not be registered; the build continues without it
    #[error("Failed to add counter {path}: {status}")]
    CounterAdd { path: String, status: PdhStatus },

    /// A counter could not be detached; it stays on the query until close
    #[error("Failed to remove counter {counter:#x}: {status}")]
    CounterRemove { counter: usize, status: PdhStatus },

    /// One counter had no value this round; it contributes 0
    #[error("Failed to read counter (device {device}): status={status}, cstatus={cstatus}")]
    CounterRead {
        device: String,
        status: PdhStatus,
        cstatus: PdhStatus,
    },

    #[error("PDH performance counters are only available on Windows")]
    Unsupported,
}

impl GpuError {
    /// Whether the error should abort the caller's workflow
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GpuError::CounterAdd { .. }
                | GpuError::CounterRemove { .. }
                | GpuError::CounterRead { .. }
        )
    }
}
