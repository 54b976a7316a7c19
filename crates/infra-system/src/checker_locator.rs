// Filesystem-specific checker lookup (fsck.<type>)
use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tracing::debug;

use bootcheck_core::port::{CheckerLocator, LocatorError};

/// Always searched after $PATH
const SYSTEM_DIRS: [&str; 2] = ["/sbin", "/usr/sbin"];

pub struct PathCheckerLocator {
    search_dirs: Vec<PathBuf>,
}

impl PathCheckerLocator {
    /// Search $PATH followed by the system binary directories
    pub fn from_env() -> Self {
        let mut dirs: Vec<PathBuf> = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();
        dirs.extend(SYSTEM_DIRS.iter().map(PathBuf::from));
        Self::new(dirs)
    }

    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }
}

impl CheckerLocator for PathCheckerLocator {
    fn checker_exists(&self, fs_type: &str) -> Result<bool, LocatorError> {
        let name = format!("fsck.{}", fs_type);

        for dir in &self.search_dirs {
            let candidate = dir.join(&name);
            let metadata = match candidate.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(LocatorError::NotExecutable(candidate));
            }

            debug!(checker = %candidate.display(), "Found checker");
            return Ok(true);
        }

        Ok(false)
    }
}
