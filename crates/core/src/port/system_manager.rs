// System Manager Port
// Requests reboot/emergency transitions from the service manager

use async_trait::async_trait;
use thiserror::Error;

/// System manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// The manager is not running or refused with "no such job"
    #[error("No such job: {0}")]
    NoSuchJob(String),

    #[error("Start request failed: {0}")]
    Failed(String),
}

/// System manager trait
#[async_trait]
pub trait SystemManager: Send + Sync {
    /// Start `target`, replacing conflicting queued jobs
    async fn start_target(&self, target: &str) -> Result<(), ManagerError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records requested targets and answers with a fixed response
    pub struct RecordingManager {
        response: Result<(), ManagerError>,
        requests: Mutex<Vec<String>>,
    }

    impl RecordingManager {
        pub fn new() -> Self {
            Self::with_response(Ok(()))
        }

        pub fn with_response(response: Result<(), ManagerError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Default for RecordingManager {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SystemManager for RecordingManager {
        async fn start_target(&self, target: &str) -> Result<(), ManagerError> {
            self.requests.lock().unwrap().push(target.to_string());
            self.response.clone()
        }
    }
}
