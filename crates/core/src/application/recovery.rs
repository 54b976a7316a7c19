// Recovery state machine: bounded retry, then console repair, then escalation
use std::os::fd::AsRawFd;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::classify::classify;
use crate::application::command::CommandBuilder;
use crate::application::constants::{EXIT_FAILURE, EXIT_SUCCESS, MAX_ATTEMPTS};
use crate::domain::{
    CheckConfig, CheckTarget, Escalation, ExitOutcome, OutcomeFlag, RecoveryState, Stage,
};
use crate::error::{AppError, Result};
use crate::port::{
    ConsoleProvider, ConsoleSession, ManagerError, MarkerStore, ProcessSupervisor, SystemManager,
};

/// One check attempt and the state it ran in
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub state: RecoveryState,
    pub outcome: ExitOutcome,
}

/// Result of a full recovery run
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    /// `Done` or `Escalated(_)`
    pub final_state: RecoveryState,
    pub attempts: Vec<AttemptRecord>,
    /// A companion (quota) check was requested
    pub marker_recorded: bool,
}

impl RecoveryReport {
    pub fn last_outcome(&self) -> Option<&ExitOutcome> {
        self.attempts.last().map(|a| &a.outcome)
    }

    pub fn escalation(&self) -> Option<Escalation> {
        match self.final_state {
            RecoveryState::Escalated(escalation) => Some(escalation),
            _ => None,
        }
    }

    pub fn interactive_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.state.stage() == Some(Stage::Interactive))
            .count()
    }

    /// Ended without escalation, but the last attempt still failed
    pub fn ignored_failure(&self) -> bool {
        self.escalation().is_none() && self.last_outcome().is_some_and(|o| !o.is_success())
    }

    pub fn exit_code(&self) -> u8 {
        if self.escalation().is_some() {
            EXIT_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Recovery state machine
///
/// Drives check attempts for one target:
/// 1. unattended attempt; on reboot-required/unrepairable retry once
/// 2. still failing: take over a console and run a forced repair
/// 3. forced repair asks for reboot: retry once, then request reboot
/// 4. forced repair reports unrepairable: request emergency mode
pub struct RecoveryStateMachine {
    supervisor: Arc<dyn ProcessSupervisor>,
    console: Arc<dyn ConsoleProvider>,
    manager: Arc<dyn SystemManager>,
    markers: Arc<dyn MarkerStore>,
    commands: CommandBuilder,
    config: CheckConfig,
}

impl RecoveryStateMachine {
    /// Create a new recovery state machine
    ///
    /// # Example
    /// ```ignore
    /// let recovery = RecoveryStateMachine::new(
    ///     supervisor,
    ///     console,
    ///     manager,
    ///     markers,
    ///     CommandBuilder::new("/sbin/fsck"),
    ///     config,
    /// );
    /// let report = recovery.run(&target).await?;
    /// ```
    pub fn new(
        supervisor: Arc<dyn ProcessSupervisor>,
        console: Arc<dyn ConsoleProvider>,
        manager: Arc<dyn SystemManager>,
        markers: Arc<dyn MarkerStore>,
        commands: CommandBuilder,
        config: CheckConfig,
    ) -> Self {
        Self {
            supervisor,
            console,
            manager,
            markers,
            commands,
            config,
        }
    }

    /// Run attempts until `Done` or `Escalated`
    ///
    /// # Errors
    /// - AppError::Supervisor if a check process cannot be spawned
    /// - AppError::Console if interactive repair is needed but no console
    ///   qualifies
    pub async fn run(&self, target: &CheckTarget) -> Result<RecoveryReport> {
        let mut state = RecoveryState::Initial;
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut session: Option<Box<dyn ConsoleSession>> = None;

        info!(target = %target, "Starting file system check");

        while let Some(stage) = state.stage() {
            if attempts.len() >= MAX_ATTEMPTS {
                return Err(AppError::Internal(format!(
                    "recovery did not settle after {} attempts (state {})",
                    attempts.len(),
                    state
                )));
            }

            if stage == Stage::Interactive && session.is_none() {
                session = Some(self.take_console()?);
            }

            let outcome = self.attempt(stage, target, session.as_deref_mut()).await?;
            let next = state.advance(&outcome)?;

            info!(
                from = %state,
                to = %next,
                flags = %outcome.flags,
                "Recovery transition"
            );

            attempts.push(AttemptRecord { state, outcome });
            state = next;
        }

        let mut report = RecoveryReport {
            final_state: state,
            attempts,
            marker_recorded: false,
        };

        if report.ignored_failure() {
            warn!("Ignoring error.");
        }

        if report
            .last_outcome()
            .is_some_and(|o| o.has(OutcomeFlag::Repaired))
        {
            report.marker_recorded = self.record_marker();
        }

        if let Some(escalation) = report.escalation() {
            if escalation == Escalation::Emergency {
                if let Some(console) = session.as_deref_mut() {
                    announce(
                        console,
                        "\n\nThe file system could not be repaired. Manual intervention is required.\n",
                    );
                }
            }
            self.escalate(escalation).await;
        }

        Ok(report)
    }

    /// Run one check attempt for `stage`
    async fn attempt(
        &self,
        stage: Stage,
        target: &CheckTarget,
        console: Option<&mut (dyn ConsoleSession + 'static)>,
    ) -> Result<ExitOutcome> {
        let raw = match stage {
            Stage::Unattended => {
                let pipe = if self.config.show_progress {
                    match self.supervisor.open_progress_pipe() {
                        Ok(pipe) => Some(pipe),
                        Err(e) => {
                            warn!(error = %e, "Progress reporting disabled for this attempt");
                            None
                        }
                    }
                } else {
                    None
                };

                let fd = pipe.as_ref().map(|p| p.writer.as_raw_fd());
                let mut invocation = self.commands.build(&self.config, target, fd)?;
                let reader = match pipe {
                    Some(pipe) => {
                        invocation = invocation.with_progress_writer(pipe.writer);
                        Some(pipe.reader)
                    }
                    None => None,
                };

                debug!(command = %invocation.display(), "Running unattended check");
                self.supervisor.run(invocation, reader).await?
            }
            Stage::Interactive => {
                let invocation = self.commands.forced(&self.config, target)?;
                debug!(command = %invocation.display(), "Running forced repair");
                self.supervisor.run(invocation, None).await?
            }
        };

        let outcome = classify(&raw);
        if outcome.needs_inspection() {
            error!(
                stage = ?stage,
                exit_code = ?outcome.exit_code,
                signal = ?outcome.terminating_signal,
                "fsck {}.",
                outcome.describe()
            );
            if let Some(console) = console {
                announce(console, &format!("\rfsck -y {}.\n", outcome.describe()));
            }
        } else {
            info!(stage = ?stage, flags = %outcome.flags, "fsck {}", outcome.describe());
        }

        Ok(outcome)
    }

    fn take_console(&self) -> Result<Box<dyn ConsoleSession>> {
        let mut session = self.console.acquire().map_err(|e| {
            error!(error = %e, "No console available for interactive repair");
            AppError::from(e)
        })?;

        info!(device = %session.device().display(), "Took over console for interactive repair");
        announce(session.as_mut(), "\rTry to repair with fsck -y ...\n");
        Ok(session)
    }

    fn record_marker(&self) -> bool {
        match self.markers.request_companion_check() {
            Ok(()) => {
                info!("Repairs made, requested quota check");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to record quota check marker");
                false
            }
        }
    }

    async fn escalate(&self, escalation: Escalation) {
        let target = escalation.target();
        error!(target = %target, "File system repair exhausted, requesting {}", target);

        match self.manager.start_target(target).await {
            Ok(()) => info!(target = %target, "Running request {}/start/replace", target),
            // Not fatal: the manager may not run in every boot environment
            Err(ManagerError::NoSuchJob(msg)) => {
                debug!(target = %target, reason = %msg, "System manager has no such job")
            }
            Err(ManagerError::Failed(msg)) => {
                error!(target = %target, reason = %msg, "Failed to start unit")
            }
        }
    }
}

fn announce(console: &mut dyn ConsoleSession, text: &str) {
    if let Err(e) = console.announce(text) {
        warn!(device = %console.device().display(), error = %e, "Failed to write to console");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CheckMode, RawStatus, RepairMode};
    use crate::port::console::mocks::RecordingConsole;
    use crate::port::marker::mocks::InMemoryMarkers;
    use crate::port::process::mocks::ScriptedSupervisor;
    use crate::port::system_manager::mocks::RecordingManager;
    use crate::port::ConsoleError;

    struct Harness {
        supervisor: Arc<ScriptedSupervisor>,
        console: Arc<RecordingConsole>,
        manager: Arc<RecordingManager>,
        markers: Arc<InMemoryMarkers>,
        recovery: RecoveryStateMachine,
    }

    fn harness_with(
        supervisor: ScriptedSupervisor,
        console: RecordingConsole,
        manager: RecordingManager,
        config: CheckConfig,
    ) -> Harness {
        let supervisor = Arc::new(supervisor);
        let console = Arc::new(console);
        let manager = Arc::new(manager);
        let markers = Arc::new(InMemoryMarkers::new());
        let recovery = RecoveryStateMachine::new(
            supervisor.clone(),
            console.clone(),
            manager.clone(),
            markers.clone(),
            CommandBuilder::new("/sbin/fsck"),
            config,
        );
        Harness {
            supervisor,
            console,
            manager,
            markers,
            recovery,
        }
    }

    fn harness(codes: &[i32]) -> Harness {
        harness_with(
            ScriptedSupervisor::exiting(codes),
            RecordingConsole::new(),
            RecordingManager::new(),
            CheckConfig::default(),
        )
    }

    fn root() -> CheckTarget {
        CheckTarget::new("/dev/sda1", true, Some("ext4".to_string()))
    }

    fn states(report: &RecoveryReport) -> Vec<RecoveryState> {
        report.attempts.iter().map(|a| a.state).collect()
    }

    #[tokio::test]
    async fn test_clean_check_is_single_attempt() {
        let h = harness(&[0]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.final_state, RecoveryState::Done);
        assert_eq!(h.supervisor.call_count(), 1);
        assert!(!report.marker_recorded);
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.console.acquisitions(), 0);
        assert!(h.manager.requests().is_empty());
    }

    #[tokio::test]
    async fn test_repaired_records_marker_without_escalation() {
        let h = harness(&[1]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.final_state, RecoveryState::Done);
        assert!(report.marker_recorded);
        assert_eq!(h.markers.requests(), 1);
        assert!(h.manager.requests().is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_retries_unattended() {
        // 5 = repaired + unrepairable, then a clean second pass
        let h = harness(&[5, 0]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(
            states(&report),
            vec![RecoveryState::Initial, RecoveryState::AutoRetry]
        );
        assert_eq!(report.final_state, RecoveryState::Done);
        assert_eq!(h.console.acquisitions(), 0);
        assert!(!report.marker_recorded);

        let runs = h.supervisor.runs();
        assert_eq!(runs[0].argv, runs[1].argv);
    }

    #[tokio::test]
    async fn test_console_repair_after_two_unattended_failures() {
        let h = harness(&[4, 4, 1]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(
            states(&report),
            vec![
                RecoveryState::Initial,
                RecoveryState::AutoRetry,
                RecoveryState::ConsoleRepair
            ]
        );
        assert_eq!(report.final_state, RecoveryState::Done);
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert!(report.marker_recorded);
        assert_eq!(h.console.acquisitions(), 1);

        let runs = h.supervisor.runs();
        assert_eq!(runs[2].argv, vec!["/sbin/fsck", "-y", "-T", "/dev/sda1"]);
        assert!(h.console.transcript()[0].contains("Try to repair"));
    }

    #[tokio::test]
    async fn test_interactive_reboot_retries_exactly_once() {
        let h = harness(&[2, 2, 2, 2]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.interactive_attempts(), 2);
        assert_eq!(h.supervisor.call_count(), 4);
        assert_eq!(report.final_state, RecoveryState::Escalated(Escalation::Reboot));
        assert_eq!(h.manager.requests(), vec!["reboot.target"]);
        assert_eq!(report.exit_code(), EXIT_FAILURE);
        assert_eq!(h.console.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_interactive_unrepairable_escalates_without_retry() {
        let h = harness(&[4, 4, 4]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.interactive_attempts(), 1);
        assert_eq!(
            report.final_state,
            RecoveryState::Escalated(Escalation::Emergency)
        );
        assert_eq!(h.manager.requests(), vec!["emergency.target"]);
        let transcript = h.console.transcript();
        assert!(transcript
            .iter()
            .any(|line| line.contains("Manual intervention is required")));
    }

    #[tokio::test]
    async fn test_interactive_retry_then_unrepairable_goes_to_emergency() {
        let h = harness(&[2, 2, 2, 4]);
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.interactive_attempts(), 2);
        assert_eq!(
            report.final_state,
            RecoveryState::Escalated(Escalation::Emergency)
        );
        assert_eq!(h.manager.requests(), vec!["emergency.target"]);
    }

    #[tokio::test]
    async fn test_signal_is_ignored_failure() {
        let h = harness_with(
            ScriptedSupervisor::new(vec![Ok(RawStatus::Signaled {
                signal: "SIGTERM".to_string(),
                core_dumped: false,
            })]),
            RecordingConsole::new(),
            RecordingManager::new(),
            CheckConfig::default(),
        );
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.final_state, RecoveryState::Done);
        assert!(report.ignored_failure());
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
        assert_eq!(h.supervisor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal_and_not_retried() {
        let h = harness_with(
            ScriptedSupervisor::new(vec![Err("No such file or directory".to_string())]),
            RecordingConsole::new(),
            RecordingManager::new(),
            CheckConfig::default(),
        );
        let err = h.recovery.run(&root()).await.unwrap_err();

        assert!(matches!(err, AppError::Supervisor(_)));
        assert_eq!(h.supervisor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_console_is_fatal() {
        let h = harness_with(
            ScriptedSupervisor::exiting(&[4, 4]),
            RecordingConsole::unavailable(),
            RecordingManager::new(),
            CheckConfig::default(),
        );
        let err = h.recovery.run(&root()).await.unwrap_err();

        assert!(matches!(err, AppError::Console(ConsoleError::Unavailable)));
        assert_eq!(h.supervisor.call_count(), 2);
        assert!(h.manager.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_such_job_is_not_fatal() {
        let h = harness_with(
            ScriptedSupervisor::exiting(&[4, 4, 4]),
            RecordingConsole::new(),
            RecordingManager::with_response(Err(ManagerError::NoSuchJob(
                "org.freedesktop.systemd1.NoSuchJob".to_string(),
            ))),
            CheckConfig::default(),
        );
        let report = h.recovery.run(&root()).await.unwrap();

        assert_eq!(report.escalation(), Some(Escalation::Emergency));
        assert_eq!(h.manager.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_pipe_only_for_unattended_attempts() {
        let config = CheckConfig::new(CheckMode::Auto, RepairMode::Preen, true);
        let h = harness_with(
            ScriptedSupervisor::exiting(&[2, 2, 0]),
            RecordingConsole::new(),
            RecordingManager::new(),
            config,
        );
        h.recovery.run(&root()).await.unwrap();

        let runs = h.supervisor.runs();
        assert_eq!(runs.len(), 3);
        for run in &runs[..2] {
            assert!(run.had_progress_writer);
            assert!(run.had_progress_reader);
            assert!(run.argv.iter().any(|a| a.starts_with("-C")));
        }
        assert!(!runs[2].had_progress_writer);
        assert!(!runs[2].had_progress_reader);
    }
}
