//! End-to-end recovery runs against a scripted check tool
//!
//! The real subprocess supervisor, progress monitor and marker store are
//! used; console, system manager and device lookup are mocks.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use bootcheck_core::application::{
    CheckSession, CommandBuilder, ProgressMonitor, RecoveryStateMachine, SessionReport,
};
use bootcheck_core::domain::{CheckConfig, CheckMode, CheckTarget, Escalation, RepairMode, RecoveryState};
use bootcheck_core::port::checker::mocks::StaticLocator;
use bootcheck_core::port::console::mocks::{RecordingConsole, RecordingProgressConsole};
use bootcheck_core::port::device::mocks::StaticResolver;
use bootcheck_core::port::system_manager::mocks::RecordingManager;
use bootcheck_core::port::time_provider::SystemTimeProvider;
use bootcheck_core::port::{RootDevice, TimeProvider};
use bootcheck_core::AppError;
use bootcheck_infra_system::{FileMarkerStore, SubprocessSupervisor};

/// Fake check tool: logs its arguments, emits one progress record when
/// given `-C<fd>`, and exits with the next code listed in `codes`.
struct FakeTool {
    dir: TempDir,
}

impl FakeTool {
    fn new(codes: &[i32]) -> Self {
        let dir = TempDir::new().unwrap();
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        fs::write(dir.path().join("codes"), codes.join("\n") + "\n").unwrap();

        let d = dir.path().display();
        let script = format!(
            r#"#!/bin/sh
echo "$@" >> {d}/args
n=$(cat {d}/count 2>/dev/null || echo 0)
n=$((n + 1))
echo $n > {d}/count
for a in "$@"; do
    case "$a" in -C*) fd=${{a#-C}} ;; esac
done
if [ -n "$fd" ]; then
    printf '1 40 100 /dev/sdz1\n' > /proc/self/fd/$fd
fi
code=$(sed -n "${{n}}p" {d}/codes)
exit ${{code:-0}}
"#
        );
        let tool = dir.path().join("fsck");
        fs::write(&tool, script).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    fn path(&self) -> PathBuf {
        self.dir.path().join("fsck")
    }

    fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn marker(&self) -> PathBuf {
        self.dir.path().join("quotacheck")
    }
}

struct Harness {
    recovery: RecoveryStateMachine,
    console: Arc<RecordingConsole>,
    manager: Arc<RecordingManager>,
    progress: RecordingProgressConsole,
}

fn harness(tool: &FakeTool, config: CheckConfig, console: RecordingConsole) -> Harness {
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());
    let progress = RecordingProgressConsole::new(true);
    let monitor = Arc::new(ProgressMonitor::new(Arc::new(progress.clone()), clock.clone()));
    let console = Arc::new(console);
    let manager = Arc::new(RecordingManager::new());

    let recovery = RecoveryStateMachine::new(
        Arc::new(SubprocessSupervisor::new(monitor, clock)),
        console.clone(),
        manager.clone(),
        Arc::new(FileMarkerStore::new(tool.marker())),
        CommandBuilder::new(tool.path()),
        config,
    );

    Harness {
        recovery,
        console,
        manager,
        progress,
    }
}

fn root() -> CheckTarget {
    CheckTarget::new("/dev/sdz1", true, Some("ext4".to_string()))
}

fn with_progress() -> CheckConfig {
    CheckConfig::new(CheckMode::Auto, RepairMode::Preen, true)
}

#[tokio::test]
async fn test_clean_filesystem_single_run_with_progress() {
    let tool = FakeTool::new(&[0]);
    let h = harness(&tool, with_progress(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.final_state, RecoveryState::Done);
    assert_eq!(report.exit_code(), 0);
    assert!(!tool.marker().exists());

    let invocations = tool.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].starts_with("-a -T -C"));
    assert!(invocations[0].ends_with("/dev/sdz1"));

    let writes = h.progress.writes();
    assert!(writes.iter().any(|w| w.contains("/dev/sdz1: fsck 28.0% complete...")));
    assert_eq!(h.console.acquisitions(), 0);
}

#[tokio::test]
async fn test_repair_touches_marker() {
    let tool = FakeTool::new(&[1]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.final_state, RecoveryState::Done);
    assert!(report.marker_recorded);
    assert!(tool.marker().exists());
    assert!(h.progress.writes().is_empty());
}

#[tokio::test]
async fn test_transient_failure_recovers_unattended() {
    let tool = FakeTool::new(&[4, 0]);
    let h = harness(&tool, with_progress(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.final_state, RecoveryState::Done);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(h.console.acquisitions(), 0);
    assert!(tool.invocations().iter().all(|args| args.starts_with("-a ")));
}

#[tokio::test]
async fn test_interactive_repair_succeeds() {
    let tool = FakeTool::new(&[4, 4, 1]);
    let h = harness(&tool, with_progress(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.final_state, RecoveryState::Done);
    assert_eq!(report.interactive_attempts(), 1);
    assert!(report.marker_recorded);
    assert_eq!(h.console.acquisitions(), 1);
    assert!(h.manager.requests().is_empty());

    let invocations = tool.invocations();
    assert_eq!(invocations.len(), 3);
    // forced repair: no progress pipe
    assert_eq!(invocations[2], "-y -T /dev/sdz1");
}

#[tokio::test]
async fn test_unrepairable_escalates_to_emergency() {
    let tool = FakeTool::new(&[4, 4, 4]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.escalation(), Some(Escalation::Emergency));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(tool.invocations().len(), 3);
    assert_eq!(h.manager.requests(), vec!["emergency.target".to_string()]);
    assert!(h
        .console
        .transcript()
        .iter()
        .any(|line| line.contains("Manual intervention is required")));
}

#[tokio::test]
async fn test_repeated_reboot_request_escalates_to_reboot() {
    let tool = FakeTool::new(&[2, 2, 3, 3]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert_eq!(report.escalation(), Some(Escalation::Reboot));
    assert_eq!(report.interactive_attempts(), 2);
    assert_eq!(h.manager.requests(), vec!["reboot.target".to_string()]);
}

#[tokio::test]
async fn test_operational_error_is_ignored() {
    let tool = FakeTool::new(&[8]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::new());

    let report = h.recovery.run(&root()).await.unwrap();

    assert!(report.ignored_failure());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(tool.invocations().len(), 1);
}

#[tokio::test]
async fn test_no_console_for_interactive_repair_is_fatal() {
    let tool = FakeTool::new(&[4, 4]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::unavailable());

    let err = h.recovery.run(&root()).await.unwrap_err();

    assert!(matches!(err, AppError::Console(_)));
    assert_eq!(err.exit_code(), 255);
    assert_eq!(tool.invocations().len(), 2);
}

#[tokio::test]
async fn test_missing_tool_is_a_spawn_failure() {
    let tool = FakeTool::new(&[0]);
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());
    let monitor = Arc::new(ProgressMonitor::new(
        Arc::new(RecordingProgressConsole::new(true)),
        clock.clone(),
    ));
    let recovery = RecoveryStateMachine::new(
        Arc::new(SubprocessSupervisor::new(monitor, clock)),
        Arc::new(RecordingConsole::new()),
        Arc::new(RecordingManager::new()),
        Arc::new(FileMarkerStore::new(tool.marker())),
        CommandBuilder::new(Path::new("/nonexistent/fsck")),
        with_progress(),
    );

    let err = recovery.run(&root()).await.unwrap_err();

    assert!(matches!(err, AppError::Supervisor(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_session_checks_named_device_as_non_root() {
    let tool = FakeTool::new(&[0]);
    let h = harness(&tool, CheckConfig::default(), RecordingConsole::new());
    let session = CheckSession::new(
        Arc::new(StaticResolver::new(RootDevice::Virtual).with_device_type("ext4")),
        Arc::new(StaticLocator::new(&["ext4"])),
        h.recovery,
        CheckConfig::default(),
    );

    let report = session.run(Some(Path::new("/dev/sdz2"))).await.unwrap();

    assert!(matches!(report, SessionReport::Checked(_)));
    assert_eq!(tool.invocations(), vec!["-a -T -M /dev/sdz2".to_string()]);
}
