// Process Supervisor Port
// Abstraction for running one check-tool process to completion

use std::os::fd::OwnedFd;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CheckInvocation, RawStatus};

/// Both ends of a progress pipe
///
/// The writer goes into the `CheckInvocation` (and from there to the
/// child); the reader is handed back to the supervisor's `run`.
#[derive(Debug)]
pub struct ProgressPipe {
    pub reader: OwnedFd,
    pub writer: OwnedFd,
}

/// Supervisor errors
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Spawn failed: {0}")]
    Spawn(String),

    #[error("Progress pipe unavailable: {0}")]
    Pipe(String),

    #[error("Wait failed: {0}")]
    Wait(String),
}

/// Process Supervisor trait
///
/// Exactly one child exists per `run` call and it is always reaped before
/// `run` returns.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Create a fresh progress pipe for one attempt
    ///
    /// # Errors
    /// - SupervisorError::Pipe if the pipe cannot be created
    fn open_progress_pipe(&self) -> Result<ProgressPipe, SupervisorError>;

    /// Spawn the invocation, drain `progress` to end-of-stream, then wait
    ///
    /// # Errors
    /// - SupervisorError::Spawn if the process cannot be launched (fatal)
    /// - SupervisorError::Wait if the child status cannot be collected
    async fn run(
        &self,
        invocation: CheckInvocation,
        progress: Option<OwnedFd>,
    ) -> Result<RawStatus, SupervisorError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::os::unix::net::UnixStream;
    use std::sync::Mutex;

    /// Recorded call to `ScriptedSupervisor::run`
    #[derive(Debug, Clone)]
    pub struct RecordedRun {
        pub argv: Vec<String>,
        pub had_progress_writer: bool,
        pub had_progress_reader: bool,
    }

    /// Supervisor that replays scripted termination statuses
    pub struct ScriptedSupervisor {
        script: Mutex<VecDeque<Result<RawStatus, String>>>,
        runs: Mutex<Vec<RecordedRun>>,
    }

    impl ScriptedSupervisor {
        pub fn new(script: Vec<Result<RawStatus, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                runs: Mutex::new(Vec::new()),
            }
        }

        /// Every run exits with the given codes, in order
        pub fn exiting(codes: &[i32]) -> Self {
            Self::new(codes.iter().map(|c| Ok(RawStatus::Exited(*c))).collect())
        }

        pub fn runs(&self) -> Vec<RecordedRun> {
            self.runs.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.runs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProcessSupervisor for ScriptedSupervisor {
        fn open_progress_pipe(&self) -> Result<ProgressPipe, SupervisorError> {
            let (reader, writer) =
                UnixStream::pair().map_err(|e| SupervisorError::Pipe(e.to_string()))?;
            Ok(ProgressPipe {
                reader: reader.into(),
                writer: writer.into(),
            })
        }

        async fn run(
            &self,
            invocation: CheckInvocation,
            progress: Option<OwnedFd>,
        ) -> Result<RawStatus, SupervisorError> {
            self.runs.lock().unwrap().push(RecordedRun {
                argv: invocation
                    .argv()
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
                had_progress_writer: invocation.has_progress_writer(),
                had_progress_reader: progress.is_some(),
            });

            match self.script.lock().unwrap().pop_front() {
                Some(Ok(status)) => Ok(status),
                Some(Err(msg)) => Err(SupervisorError::Spawn(msg)),
                None => Err(SupervisorError::Spawn("script exhausted".to_string())),
            }
        }
    }
}
