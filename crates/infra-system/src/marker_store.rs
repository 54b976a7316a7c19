// Companion quota-check marker
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use tracing::debug;

use bootcheck_core::port::MarkerStore;

/// Touches a marker file that the quota check unit conditions on
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarkerStore for FileMarkerStore {
    fn request_companion_check(&self) -> io::Result<()> {
        let file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        file.set_modified(SystemTime::now())?;

        debug!(marker = %self.path.display(), "Requested quota check");
        Ok(())
    }
}
