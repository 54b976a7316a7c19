// Time Provider Port (for testability)

use std::time::{Duration, Instant};

/// Monotonic time source (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin; never goes backwards
    fn monotonic(&self) -> Duration;
}

/// Monotonic clock anchored at construction (production)
pub struct SystemTimeProvider {
    origin: Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Clock that returns scripted instants, then repeats the last one
    pub struct ManualClock {
        ticks: Mutex<VecDeque<Duration>>,
        last: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new(ticks_ms: &[u64]) -> Self {
            Self {
                ticks: Mutex::new(ticks_ms.iter().map(|ms| Duration::from_millis(*ms)).collect()),
                last: Mutex::new(Duration::ZERO),
            }
        }
    }

    impl TimeProvider for ManualClock {
        fn monotonic(&self) -> Duration {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.ticks.lock().unwrap().pop_front() {
                *last = next;
            }
            *last
        }
    }
}
