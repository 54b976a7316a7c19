// Marker Store Port
// Persisted flag asking a downstream component to re-verify quotas

use std::io;

pub trait MarkerStore: Send + Sync {
    /// Record that repairs were made and a companion check is due
    fn request_companion_check(&self) -> io::Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryMarkers {
        requests: Mutex<usize>,
    }

    impl InMemoryMarkers {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn requests(&self) -> usize {
            *self.requests.lock().unwrap()
        }
    }

    impl MarkerStore for InMemoryMarkers {
        fn request_companion_check(&self) -> io::Result<()> {
            *self.requests.lock().unwrap() += 1;
            Ok(())
        }
    }
}
