// Console Ports
// Interactive console takeover and the shared progress console

use std::io;
use std::path::Path;

use thiserror::Error;

/// Console errors
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Couldn't get a file descriptor referring to the console")]
    Unavailable,

    #[error("Console IO error: {0}")]
    Io(#[from] io::Error),
}

/// Exclusive interactive use of a physical console
///
/// Dropping the session releases the device.
pub trait ConsoleSession: Send {
    /// Device the session writes to
    fn device(&self) -> &Path;

    /// Show a line of text to the operator
    fn announce(&mut self, text: &str) -> io::Result<()>;
}

/// Locates and takes over a console for manual-repair progress
pub trait ConsoleProvider: Send + Sync {
    /// # Errors
    /// - ConsoleError::Unavailable if no qualifying console exists (fatal)
    fn acquire(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError>;
}

/// Console device shared between concurrent check supervisors
pub trait ProgressConsole: Send {
    /// Non-blocking exclusive advisory lock
    ///
    /// Returns `Ok(false)` when another instance holds it. The lock lives
    /// as long as this value.
    fn try_lock(&mut self) -> io::Result<bool>;

    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Opens the progress console once per monitored attempt
pub trait ProgressConsoleOpener: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn ProgressConsole>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Console provider that records everything announced
    pub struct RecordingConsole {
        available: bool,
        transcript: Arc<Mutex<Vec<String>>>,
        acquisitions: Arc<Mutex<usize>>,
    }

    impl RecordingConsole {
        pub fn new() -> Self {
            Self {
                available: true,
                transcript: Arc::new(Mutex::new(Vec::new())),
                acquisitions: Arc::new(Mutex::new(0)),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new()
            }
        }

        pub fn transcript(&self) -> Vec<String> {
            self.transcript.lock().unwrap().clone()
        }

        pub fn acquisitions(&self) -> usize {
            *self.acquisitions.lock().unwrap()
        }
    }

    impl Default for RecordingConsole {
        fn default() -> Self {
            Self::new()
        }
    }

    struct RecordingSession {
        device: PathBuf,
        transcript: Arc<Mutex<Vec<String>>>,
    }

    impl ConsoleSession for RecordingSession {
        fn device(&self) -> &Path {
            &self.device
        }

        fn announce(&mut self, text: &str) -> io::Result<()> {
            self.transcript.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl ConsoleProvider for RecordingConsole {
        fn acquire(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError> {
            if !self.available {
                return Err(ConsoleError::Unavailable);
            }
            *self.acquisitions.lock().unwrap() += 1;
            Ok(Box::new(RecordingSession {
                device: PathBuf::from("/dev/tty8"),
                transcript: Arc::clone(&self.transcript),
            }))
        }
    }

    /// Progress console that records writes and lock attempts
    #[derive(Clone)]
    pub struct RecordingProgressConsole {
        lock_available: bool,
        writes: Arc<Mutex<Vec<String>>>,
        lock_attempts: Arc<Mutex<usize>>,
    }

    impl RecordingProgressConsole {
        pub fn new(lock_available: bool) -> Self {
            Self {
                lock_available,
                writes: Arc::new(Mutex::new(Vec::new())),
                lock_attempts: Arc::new(Mutex::new(0)),
            }
        }

        pub fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }

        pub fn lock_attempts(&self) -> usize {
            *self.lock_attempts.lock().unwrap()
        }
    }

    impl ProgressConsole for RecordingProgressConsole {
        fn try_lock(&mut self) -> io::Result<bool> {
            *self.lock_attempts.lock().unwrap() += 1;
            Ok(self.lock_available)
        }

        fn write_text(&mut self, text: &str) -> io::Result<()> {
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl ProgressConsoleOpener for RecordingProgressConsole {
        fn open(&self) -> io::Result<Box<dyn ProgressConsole>> {
            Ok(Box::new(self.clone()))
        }
    }
}
