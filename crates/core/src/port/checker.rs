// Checker Locator Port
// Answers whether a type-specific check tool (fsck.<type>) is installed

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("{0} exists but is not executable")]
    NotExecutable(PathBuf),
}

pub trait CheckerLocator: Send + Sync {
    /// # Returns
    /// `Ok(false)` when no checker for `fs_type` is installed
    fn checker_exists(&self, fs_type: &str) -> Result<bool, LocatorError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    pub struct StaticLocator {
        installed: Vec<String>,
    }

    impl StaticLocator {
        pub fn new(installed: &[&str]) -> Self {
            Self {
                installed: installed.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl CheckerLocator for StaticLocator {
        fn checker_exists(&self, fs_type: &str) -> Result<bool, LocatorError> {
            Ok(self.installed.iter().any(|t| t == fs_type))
        }
    }
}
