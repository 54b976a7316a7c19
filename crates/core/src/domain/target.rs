// Check Target Domain Model

use std::fmt;
use std::path::{Path, PathBuf};

/// Block device selected for checking
///
/// Produced by the device resolver, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTarget {
    device_path: PathBuf,
    is_root_filesystem: bool,
    filesystem_type: Option<String>,
}

impl CheckTarget {
    pub fn new(
        device_path: impl Into<PathBuf>,
        is_root_filesystem: bool,
        filesystem_type: Option<String>,
    ) -> Self {
        Self {
            device_path: device_path.into(),
            is_root_filesystem,
            filesystem_type: filesystem_type.filter(|t| !t.is_empty()),
        }
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    pub fn is_root_filesystem(&self) -> bool {
        self.is_root_filesystem
    }

    pub fn filesystem_type(&self) -> Option<&str> {
        self.filesystem_type.as_deref()
    }
}

impl fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_path.display())?;
        if let Some(fs_type) = &self.filesystem_type {
            write!(f, " ({})", fs_type)?;
        }
        if self.is_root_filesystem {
            write!(f, " [root]")?;
        }
        Ok(())
    }
}
