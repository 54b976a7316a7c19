// Check Invocation Domain Model

use std::ffi::OsString;
use std::os::fd::OwnedFd;

use super::error::DomainError;

/// One fully-built execution of the check tool
///
/// Built fresh for every attempt and consumed by the process supervisor.
/// When progress reporting is on it owns the write end of the progress
/// pipe; the supervisor must drop it right after spawning so the reader
/// sees end-of-stream once the child exits.
#[derive(Debug)]
pub struct CheckInvocation {
    argv: Vec<OsString>,
    progress_writer: Option<OwnedFd>,
}

impl CheckInvocation {
    pub fn new(argv: Vec<OsString>) -> Result<Self, DomainError> {
        if argv.is_empty() {
            return Err(DomainError::EmptyCommand);
        }
        Ok(Self {
            argv,
            progress_writer: None,
        })
    }

    /// Attach the progress pipe write end handed to the child
    pub fn with_progress_writer(mut self, writer: OwnedFd) -> Self {
        self.progress_writer = Some(writer);
        self
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn has_progress_writer(&self) -> bool {
        self.progress_writer.is_some()
    }

    /// Split into argv and the pipe write end
    pub fn into_parts(self) -> (Vec<OsString>, Option<OwnedFd>) {
        (self.argv, self.progress_writer)
    }

    /// Human readable command line for logs
    pub fn display(&self) -> String {
        self.argv
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
