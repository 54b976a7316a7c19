// Command construction for the check tool

use std::ffi::OsString;
use std::os::fd::RawFd;
use std::path::PathBuf;

use crate::application::constants::{
    FORCE_FLAG, NON_ROOT_FLAG, PROGRESS_FLAG_PREFIX, SCAN_TYPE_FLAG,
};
use crate::domain::{CheckConfig, CheckInvocation, CheckTarget, DomainError, RepairMode};

/// Builds check-tool argument vectors
///
/// Order is fixed: tool, repair flag, scan-type flag, non-root flag,
/// force flag, progress flag, device.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tool_path: PathBuf,
}

impl CommandBuilder {
    pub fn new(tool_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }

    /// Invocation for an unattended attempt
    ///
    /// `progress_fd` is the descriptor number the child will see for the
    /// progress pipe write end.
    pub fn build(
        &self,
        config: &CheckConfig,
        target: &CheckTarget,
        progress_fd: Option<RawFd>,
    ) -> Result<CheckInvocation, DomainError> {
        CheckInvocation::new(self.assemble(config.repair_mode, config, target, progress_fd))
    }

    /// Invocation for a forced repair shown on the takeover console
    pub fn forced(
        &self,
        config: &CheckConfig,
        target: &CheckTarget,
    ) -> Result<CheckInvocation, DomainError> {
        CheckInvocation::new(self.assemble(RepairMode::AlwaysYes, config, target, None))
    }

    fn assemble(
        &self,
        repair_mode: RepairMode,
        config: &CheckConfig,
        target: &CheckTarget,
        progress_fd: Option<RawFd>,
    ) -> Vec<OsString> {
        let mut argv: Vec<OsString> = vec![
            self.tool_path.clone().into_os_string(),
            repair_mode.flag().into(),
            SCAN_TYPE_FLAG.into(),
        ];

        if !target.is_root_filesystem() {
            argv.push(NON_ROOT_FLAG.into());
        }

        if config.force_check {
            argv.push(FORCE_FLAG.into());
        }

        if let Some(fd) = progress_fd {
            argv.push(format!("{}{}", PROGRESS_FLAG_PREFIX, fd).into());
        }

        argv.push(target.device_path().as_os_str().to_owned());
        argv
    }
}
