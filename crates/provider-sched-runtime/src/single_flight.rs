//! Guards against two tick bodies running concurrently within one
//! process, analogous in spirit to the teacher's `InflightTracker` but
//! scoped to a single boolean slot rather than a per-correlation-id map —
//! there is exactly one tick loop per scheduler instance.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct TickSingleFlight {
    running: AtomicBool,
}

/// RAII guard returned by [`TickSingleFlight::try_acquire`]. Clears the
/// flag on drop so a panicking tick body can't wedge the loop forever.
pub struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl TickSingleFlight {
    pub fn new() -> Self {
        TickSingleFlight {
            running: AtomicBool::new(false),
        }
    }

    /// Attempt to start a tick. Returns `None` if one is already running,
    /// in which case the caller should skip this tick rather than queue
    /// behind it.
    pub fn try_acquire(&self) -> Option<TickGuard<'_>> {
        match self
            .running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
        {
            Ok(_) => Some(TickGuard { flag: &self.running }),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_guard_held() {
        let flight = TickSingleFlight::new();
        let first = flight.try_acquire();
        assert!(first.is_some());
        assert!(flight.try_acquire().is_none());
    }

    #[test]
    fn dropping_guard_allows_next_acquire() {
        let flight = TickSingleFlight::new();
        {
            let _guard = flight.try_acquire().unwrap();
        }
        assert!(flight.try_acquire().is_some());
    }
}
