//! Pre-flight decisions: runs that must end without spawning a check tool

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use tempfile::TempDir;

use bootcheck_core::application::{
    CheckSession, CommandBuilder, RecoveryStateMachine, SessionReport, SkipReason,
};
use bootcheck_core::domain::{CheckConfig, CheckMode, CheckTarget, RepairMode};
use bootcheck_core::port::console::mocks::RecordingConsole;
use bootcheck_core::port::device::mocks::StaticResolver;
use bootcheck_core::port::marker::mocks::InMemoryMarkers;
use bootcheck_core::port::process::mocks::ScriptedSupervisor;
use bootcheck_core::port::system_manager::mocks::RecordingManager;
use bootcheck_core::port::{DeviceResolver, RootDevice};
use bootcheck_infra_system::PathCheckerLocator;

fn session(
    resolver: Arc<dyn DeviceResolver>,
    checkers: &TempDir,
    supervisor: Arc<ScriptedSupervisor>,
    config: CheckConfig,
) -> CheckSession {
    let recovery = RecoveryStateMachine::new(
        supervisor,
        Arc::new(RecordingConsole::new()),
        Arc::new(RecordingManager::new()),
        Arc::new(InMemoryMarkers::new()),
        CommandBuilder::new("/sbin/fsck"),
        config,
    );
    CheckSession::new(
        resolver,
        Arc::new(PathCheckerLocator::new(vec![checkers.path().to_path_buf()])),
        recovery,
        config,
    )
}

fn install_checker(dir: &TempDir, fs_type: &str) {
    let path = dir.path().join(format!("fsck.{}", fs_type));
    fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn root_on(fs_type: &str) -> RootDevice {
    RootDevice::Block(CheckTarget::new("/dev/vda1", true, Some(fs_type.to_string())))
}

#[tokio::test]
async fn test_virtual_root_exits_zero_without_spawning() {
    let checkers = TempDir::new().unwrap();
    let supervisor = Arc::new(ScriptedSupervisor::exiting(&[0]));
    let s = session(
        Arc::new(StaticResolver::virtual_root()),
        &checkers,
        supervisor.clone(),
        CheckConfig::default(),
    );

    let report = s.run(None).await.unwrap();

    assert!(matches!(report, SessionReport::Skipped(SkipReason::VirtualRoot)));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(supervisor.call_count(), 0);
}

#[tokio::test]
async fn test_skip_mode_resolves_nothing() {
    let checkers = TempDir::new().unwrap();
    let supervisor = Arc::new(ScriptedSupervisor::exiting(&[0]));
    let config = CheckConfig::new(CheckMode::Skip, RepairMode::Preen, false);
    let s = session(
        Arc::new(StaticResolver::new(root_on("ext4"))),
        &checkers,
        supervisor.clone(),
        config,
    );

    let report = s.run(None).await.unwrap();

    assert!(matches!(report, SessionReport::Skipped(SkipReason::ModeSkip)));
    assert_eq!(supervisor.call_count(), 0);
}

#[tokio::test]
async fn test_missing_type_specific_checker_skips() {
    let checkers = TempDir::new().unwrap();
    install_checker(&checkers, "ext4");
    let supervisor = Arc::new(ScriptedSupervisor::exiting(&[0]));
    let s = session(
        Arc::new(StaticResolver::new(root_on("xfs"))),
        &checkers,
        supervisor.clone(),
        CheckConfig::default(),
    );

    let report = s.run(None).await.unwrap();

    assert!(matches!(report, SessionReport::Skipped(SkipReason::NoChecker(t)) if t == "xfs"));
    assert_eq!(supervisor.call_count(), 0);
}

#[tokio::test]
async fn test_installed_checker_runs_root_check() {
    let checkers = TempDir::new().unwrap();
    install_checker(&checkers, "ext4");
    let supervisor = Arc::new(ScriptedSupervisor::exiting(&[0]));
    let config = CheckConfig::new(CheckMode::Force, RepairMode::Preen, false);
    let s = session(
        Arc::new(StaticResolver::new(root_on("ext4"))),
        &checkers,
        supervisor.clone(),
        config,
    );

    let report = s.run(None).await.unwrap();

    assert!(matches!(report, SessionReport::Checked(_)));
    let runs = supervisor.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].argv, vec!["/sbin/fsck", "-a", "-T", "-f", "/dev/vda1"]);
}
