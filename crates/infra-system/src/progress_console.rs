// Progress console implementation
// reason: nix Flock for the cross-instance advisory lock on the console device
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use bootcheck_core::port::{ProgressConsole, ProgressConsoleOpener};

/// Opens the system console (normally `/dev/console`) for progress lines
pub struct DevConsoleOpener {
    path: PathBuf,
}

impl DevConsoleOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressConsoleOpener for DevConsoleOpener {
    fn open(&self) -> io::Result<Box<dyn ProgressConsole>> {
        let file = OpenOptions::new().write(true).open(&self.path)?;
        Ok(Box::new(DevConsole {
            state: LockState::Unlocked(file),
        }))
    }
}

enum LockState {
    Unlocked(File),
    /// Unlocked when dropped
    Locked(Flock<File>),
    /// Lost during a failed lock call
    Closed,
}

pub struct DevConsole {
    state: LockState,
}

impl ProgressConsole for DevConsole {
    fn try_lock(&mut self) -> io::Result<bool> {
        match std::mem::replace(&mut self.state, LockState::Closed) {
            LockState::Unlocked(file) => match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => {
                    self.state = LockState::Locked(lock);
                    Ok(true)
                }
                Err((file, Errno::EWOULDBLOCK)) => {
                    self.state = LockState::Unlocked(file);
                    Ok(false)
                }
                Err((file, errno)) => {
                    self.state = LockState::Unlocked(file);
                    Err(io::Error::from(errno))
                }
            },
            LockState::Locked(lock) => {
                self.state = LockState::Locked(lock);
                Ok(true)
            }
            LockState::Closed => Err(io::Error::other("console closed")),
        }
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let mut file: &File = match &self.state {
            LockState::Unlocked(file) => file,
            LockState::Locked(lock) => &**lock,
            LockState::Closed => return Err(io::Error::other("console closed")),
        };
        file.write_all(text.as_bytes())?;
        file.flush()
    }
}
