// Subprocess supervisor implementation
// reason: tokio for async process management and pipe reading, nix for pipe2/fcntl
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::sys::signal::Signal;
use nix::unistd::pipe2;
use tokio::net::unix::pipe;
use tokio::process::Command;
use tracing::{info, warn};

use bootcheck_core::application::ProgressMonitor;
use bootcheck_core::domain::{CheckInvocation, RawStatus};
use bootcheck_core::port::{ProcessSupervisor, ProgressPipe, SupervisorError, TimeProvider};

/// Subprocess supervisor
///
/// Spawns the check tool with inherited stdio, feeds its progress pipe to
/// the `ProgressMonitor` and reaps it. The progress reader runs on the
/// same task as the wait, so the wait is only observed after the pipe hit
/// end-of-stream.
pub struct SubprocessSupervisor {
    monitor: Arc<ProgressMonitor>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessSupervisor {
    /// Create a new subprocess supervisor
    ///
    /// # Example
    /// ```ignore
    /// let supervisor = SubprocessSupervisor::new(
    ///     Arc::new(ProgressMonitor::new(console_opener, clock.clone())),
    ///     clock,
    /// );
    /// ```
    pub fn new(monitor: Arc<ProgressMonitor>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            monitor,
            time_provider,
        }
    }

    /// Drain the progress pipe through the monitor
    async fn drain_progress(&self, reader: OwnedFd) {
        match pipe::Receiver::from_owned_fd(reader) {
            Ok(receiver) => {
                self.monitor.monitor(receiver).await;
            }
            Err(e) => {
                // Dropping the reader makes the child's progress writes fail
                // with EPIPE; the check itself carries on.
                warn!(error = %e, "Cannot read progress pipe");
            }
        }
    }
}

#[async_trait]
impl ProcessSupervisor for SubprocessSupervisor {
    fn open_progress_pipe(&self) -> Result<ProgressPipe, SupervisorError> {
        let (reader, writer) =
            pipe2(OFlag::O_CLOEXEC).map_err(|e| SupervisorError::Pipe(e.to_string()))?;

        // Only the write end may leak into the child
        fcntl(writer.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::empty()))
            .map_err(|e| SupervisorError::Pipe(e.to_string()))?;

        Ok(ProgressPipe { reader, writer })
    }

    async fn run(
        &self,
        invocation: CheckInvocation,
        progress: Option<OwnedFd>,
    ) -> Result<RawStatus, SupervisorError> {
        let start_time = self.time_provider.monotonic();
        let command_line = invocation.display();
        let (argv, writer) = invocation.into_parts();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SupervisorError::Spawn("empty command".to_string()))?;

        info!(command = %command_line, "Starting check process");

        let mut child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|e| SupervisorError::Spawn(format!("{}: {}", command_line, e)))?;

        // The child holds its own copy now
        drop(writer);

        if let Some(reader) = progress {
            self.drain_progress(reader).await;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SupervisorError::Wait(e.to_string()))?;

        let raw = raw_status(status);
        let duration_ms = (self.time_provider.monotonic() - start_time).as_millis();

        info!(
            command = %command_line,
            duration_ms = %duration_ms,
            status = %raw,
            "Check process completed"
        );

        Ok(raw)
    }
}

/// Normalize an OS exit status
fn raw_status(status: ExitStatus) -> RawStatus {
    if let Some(code) = status.code() {
        return RawStatus::Exited(code);
    }

    match status.signal() {
        Some(signo) => RawStatus::Signaled {
            signal: signal_name(signo),
            core_dumped: status.core_dumped(),
        },
        None => RawStatus::Unknown,
    }
}

fn signal_name(signo: i32) -> String {
    Signal::try_from(signo)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {}", signo))
}
