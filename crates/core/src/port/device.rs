// Device Resolver Port
// Maps a path (or the root directory) to the block device to check

use std::path::Path;

use thiserror::Error;

use crate::domain::CheckTarget;

/// Resolution errors (always fatal)
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to stat '{path}': {reason}")]
    Stat { path: String, reason: String },

    #[error("Failed to detect device {0}")]
    UnknownDevice(String),

    #[error("Failed to detect device node of {0}")]
    NoDeviceNode(String),
}

/// Device backing the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootDevice {
    /// Root lives on a virtual device (major number 0): nothing to check
    Virtual,
    Block(CheckTarget),
}

pub trait DeviceResolver: Send + Sync {
    /// Resolve the filesystem mounted at `/`
    fn resolve_root(&self) -> Result<RootDevice, ResolutionError>;

    /// Resolve an explicitly named block device (never the root filesystem)
    fn resolve_device(&self, path: &Path) -> Result<CheckTarget, ResolutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Resolver answering from fixed values
    pub struct StaticResolver {
        root: RootDevice,
        filesystem_type: Option<String>,
    }

    impl StaticResolver {
        pub fn new(root: RootDevice) -> Self {
            Self {
                root,
                filesystem_type: None,
            }
        }

        pub fn virtual_root() -> Self {
            Self::new(RootDevice::Virtual)
        }

        /// Type reported for explicitly named devices
        pub fn with_device_type(mut self, fs_type: &str) -> Self {
            self.filesystem_type = Some(fs_type.to_string());
            self
        }
    }

    impl DeviceResolver for StaticResolver {
        fn resolve_root(&self) -> Result<RootDevice, ResolutionError> {
            Ok(self.root.clone())
        }

        fn resolve_device(&self, path: &Path) -> Result<CheckTarget, ResolutionError> {
            if !path.starts_with("/dev") {
                return Err(ResolutionError::UnknownDevice(path.display().to_string()));
            }
            Ok(CheckTarget::new(path, false, self.filesystem_type.clone()))
        }
    }
}
