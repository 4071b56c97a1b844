//! Wait between the two collects of a sampling round
//!
//! Rate counters need two collects at least 100 ms apart before a freshly
//! added counter yields a value. The wait is a blocking dependency so tests
//! can run rounds without real delay.

use std::time::Duration;

/// Smallest gap PDH accepts between the two collects of a round
pub const MIN_COLLECT_GAP: Duration = Duration::from_millis(100);

pub trait Pacer {
    /// Block until the second collect may run
    fn pause(&self);
}

impl<P: Pacer + ?Sized> Pacer for &P {
    fn pause(&self) {
        (**self).pause()
    }
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSleep {
    gap: Duration,
}

impl ThreadSleep {
    /// Gaps below [`MIN_COLLECT_GAP`] are raised to it
    pub fn new(gap: Duration) -> Self {
        Self {
            gap: gap.max(MIN_COLLECT_GAP),
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }
}

impl Default for ThreadSleep {
    fn default() -> Self {
        Self::new(MIN_COLLECT_GAP)
    }
}

impl Pacer for ThreadSleep {
    fn pause(&self) {
        std::thread::sleep(self.gap);
    }
}

/// Counts pauses instead of sleeping
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingPacer {
    pub pauses: std::cell::Cell<usize>,
}

#[cfg(test)]
impl Pacer for CountingPacer {
    fn pause(&self) {
        self.pauses.set(self.pauses.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_gap_is_clamped_to_minimum() {
        assert_eq!(ThreadSleep::new(Duration::from_millis(10)).gap(), MIN_COLLECT_GAP);
        assert_eq!(
            ThreadSleep::new(Duration::from_millis(250)).gap(),
            Duration::from_millis(250)
        );
        assert_eq!(ThreadSleep::default().gap(), MIN_COLLECT_GAP);
    }

    #[test]
    fn test_thread_sleep_blocks_for_gap() {
        let start = Instant::now();
        ThreadSleep::default().pause();
        assert!(start.elapsed() >= MIN_COLLECT_GAP);
    }
}
