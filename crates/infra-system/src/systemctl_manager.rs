// Service manager requests via systemctl
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use bootcheck_core::port::{ManagerError, SystemManager};

/// Stderr fragments meaning the job was refused or no manager is running
const NO_JOB_MARKERS: [&str; 3] = [
    "NoSuchJob",
    "not been booted with systemd",
    "Failed to connect to bus",
];

pub struct SystemctlManager {
    program: PathBuf,
}

impl SystemctlManager {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SystemManager for SystemctlManager {
    async fn start_target(&self, target: &str) -> Result<(), ManagerError> {
        info!(target, "Requesting start of {}", target);

        let output = Command::new(&self.program)
            .args(["start", "--no-block", "--job-mode=replace", target])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ManagerError::Failed(format!("Failed to run {}: {}", self.program.display(), e))
            })?;

        if output.status.success() {
            debug!(target, "Start job queued");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if NO_JOB_MARKERS.iter().any(|m| stderr.contains(m)) {
            Err(ManagerError::NoSuchJob(stderr))
        } else {
            Err(ManagerError::Failed(format!("{} ({})", stderr, output.status)))
        }
    }
}
