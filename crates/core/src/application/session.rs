// Check session: decide whether a check is needed, then run recovery
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::constants::EXIT_SUCCESS;
use crate::application::recovery::{RecoveryReport, RecoveryStateMachine};
use crate::domain::{CheckConfig, CheckTarget};
use crate::error::Result;
use crate::port::{CheckerLocator, DeviceResolver, RootDevice};

/// Why no check tool was spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Checking disabled by configuration
    ModeSkip,
    /// Root filesystem is not backed by a block device
    VirtualRoot,
    /// No type-specific checker installed for this filesystem type
    NoChecker(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModeSkip => write!(f, "checking disabled"),
            SkipReason::VirtualRoot => write!(f, "root file system is virtual"),
            SkipReason::NoChecker(fs_type) => write!(f, "fsck.{} doesn't exist", fs_type),
        }
    }
}

/// Result of one program run
#[derive(Debug, Clone)]
pub enum SessionReport {
    Skipped(SkipReason),
    Checked(RecoveryReport),
}

impl SessionReport {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionReport::Skipped(_) => EXIT_SUCCESS,
            SessionReport::Checked(report) => report.exit_code(),
        }
    }
}

/// Check session (composition of pre-flight and recovery)
pub struct CheckSession {
    resolver: Arc<dyn DeviceResolver>,
    locator: Arc<dyn CheckerLocator>,
    recovery: RecoveryStateMachine,
    config: CheckConfig,
}

impl CheckSession {
    pub fn new(
        resolver: Arc<dyn DeviceResolver>,
        locator: Arc<dyn CheckerLocator>,
        recovery: RecoveryStateMachine,
        config: CheckConfig,
    ) -> Self {
        Self {
            resolver,
            locator,
            recovery,
            config,
        }
    }

    /// Check `device`, or the root filesystem when `None`
    ///
    /// # Errors
    /// - AppError::Resolution if the target cannot be identified
    /// - any fatal error of `RecoveryStateMachine::run`
    pub async fn run(&self, device: Option<&Path>) -> Result<SessionReport> {
        if self.config.skips_check() {
            info!("File system check disabled by configuration, skipping");
            return Ok(SessionReport::Skipped(SkipReason::ModeSkip));
        }

        let target = match self.resolve(device)? {
            Some(target) => target,
            None => {
                info!("Root file system is virtual, skipping check");
                return Ok(SessionReport::Skipped(SkipReason::VirtualRoot));
            }
        };

        if let Some(fs_type) = target.filesystem_type() {
            match self.locator.checker_exists(fs_type) {
                Ok(true) => {}
                Ok(false) => {
                    info!(
                        device = %target.device_path().display(),
                        "fsck.{} doesn't exist, not checking file system on {}",
                        fs_type,
                        target.device_path().display()
                    );
                    return Ok(SessionReport::Skipped(SkipReason::NoChecker(
                        fs_type.to_string(),
                    )));
                }
                Err(e) => {
                    warn!(
                        device = %target.device_path().display(),
                        error = %e,
                        "fsck.{} cannot be used, checking anyway",
                        fs_type
                    );
                }
            }
        }

        let report = self.recovery.run(&target).await?;
        Ok(SessionReport::Checked(report))
    }

    /// `None` means a virtual root
    fn resolve(&self, device: Option<&Path>) -> Result<Option<CheckTarget>> {
        match device {
            Some(path) => Ok(Some(self.resolver.resolve_device(path)?)),
            None => match self.resolver.resolve_root()? {
                RootDevice::Virtual => Ok(None),
                RootDevice::Block(target) => Ok(Some(target)),
            },
        }
    }
}
