//! Bootcheck - boot-time file system check supervisor
//! Checks the root file system (or the given device), drives recovery and
//! escalates to reboot or emergency mode when repair fails.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bootcheck_core::application::constants::EXIT_FAILURE;
use bootcheck_core::application::{
    CheckSession, CommandBuilder, ProgressMonitor, RecoveryStateMachine, SessionReport,
};
use bootcheck_core::domain::CheckConfig;
use bootcheck_core::port::time_provider::SystemTimeProvider;
use bootcheck_core::port::TimeProvider;
use bootcheck_core::AppError;
use bootcheck_infra_system::{
    DevConsoleOpener, FileMarkerStore, PathCheckerLocator, SubprocessSupervisor,
    SysfsDeviceResolver, SystemctlManager, VtConsoleProvider,
};

use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "bootcheck")]
#[command(about = "Check a file system at boot and supervise its repair", long_about = None)]
#[command(version)]
struct Cli {
    /// Block device to check (default: the device backing /)
    device: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging();
    info!("Bootcheck v{} starting...", bootcheck_core::VERSION);

    let settings = Settings::load();
    let config = settings.check_config();

    match run(&cli, &settings, config).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            error!(error = ?e, "Check failed");
            let code = e
                .downcast_ref::<AppError>()
                .map(AppError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr; stdout may end up on the takeover console
fn init_logging() {
    let log_format = std::env::var("BOOTCHECK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bootcheck=info"));

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

async fn run(cli: &Cli, settings: &Settings, config: CheckConfig) -> Result<SessionReport> {
    // DI wiring
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());
    let monitor = Arc::new(ProgressMonitor::new(
        Arc::new(DevConsoleOpener::new(&settings.progress_console)),
        clock.clone(),
    ));
    let supervisor = Arc::new(SubprocessSupervisor::new(monitor, clock));

    let recovery = RecoveryStateMachine::new(
        supervisor,
        Arc::new(VtConsoleProvider::new(settings.target_vt)),
        Arc::new(SystemctlManager::new(&settings.systemctl_path)),
        Arc::new(FileMarkerStore::new(&settings.quotacheck_marker)),
        CommandBuilder::new(&settings.tool_path),
        config,
    );

    let session = CheckSession::new(
        Arc::new(SysfsDeviceResolver::new()),
        Arc::new(PathCheckerLocator::from_env()),
        recovery,
        config,
    );

    let report = session
        .run(cli.device.as_deref())
        .await
        .context("File system check did not complete")?;

    info!(exit_code = report.exit_code(), "Done");
    Ok(report)
}
