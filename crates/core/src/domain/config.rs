// Check Configuration Domain Model

use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// How the check tool may repair what it finds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairMode {
    /// Fix only safe, unambiguous inconsistencies without prompting
    #[default]
    Preen,
    /// Answer "yes" to every repair question
    AlwaysYes,
    /// Answer "no" to every repair question (report only)
    AlwaysNo,
}

impl RepairMode {
    /// Command-line flag understood by the check tool
    pub fn flag(self) -> &'static str {
        match self {
            RepairMode::Preen => "-a",
            RepairMode::AlwaysYes => "-y",
            RepairMode::AlwaysNo => "-n",
        }
    }
}

impl FromStr for RepairMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preen" => Ok(RepairMode::Preen),
            "yes" => Ok(RepairMode::AlwaysYes),
            "no" => Ok(RepairMode::AlwaysNo),
            other => Err(DomainError::ValidationError(format!(
                "unknown repair mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RepairMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairMode::Preen => write!(f, "preen"),
            RepairMode::AlwaysYes => write!(f, "yes"),
            RepairMode::AlwaysNo => write!(f, "no"),
        }
    }
}

/// Whether a check runs at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Let the check tool decide (it may skip clean filesystems)
    #[default]
    Auto,
    /// Check even filesystems marked clean
    Force,
    /// Do not check
    Skip,
}

impl FromStr for CheckMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(CheckMode::Auto),
            "force" => Ok(CheckMode::Force),
            "skip" => Ok(CheckMode::Skip),
            other => Err(DomainError::ValidationError(format!(
                "unknown check mode '{}'",
                other
            ))),
        }
    }
}

/// Immutable configuration snapshot for one run
///
/// Built once at startup from every configuration source and passed by
/// value (it is `Copy`) to each component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckConfig {
    pub repair_mode: RepairMode,
    pub force_check: bool,
    pub skip_check: bool,
    pub show_progress: bool,
}

impl CheckConfig {
    /// Combine a check mode and repair mode into a snapshot
    pub fn new(mode: CheckMode, repair_mode: RepairMode, show_progress: bool) -> Self {
        Self {
            repair_mode,
            force_check: mode == CheckMode::Force,
            skip_check: mode == CheckMode::Skip,
            show_progress,
        }
    }

    /// Apply one more mode setting on top of this snapshot
    ///
    /// Force and skip are independent flags: `auto` clears both, `force`
    /// and `skip` each set their own, and force beats skip.
    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        match mode {
            CheckMode::Auto => {
                self.force_check = false;
                self.skip_check = false;
            }
            CheckMode::Force => self.force_check = true,
            CheckMode::Skip => self.skip_check = true,
        }
        self
    }

    /// True when the configuration says not to check at all
    pub fn skips_check(&self) -> bool {
        self.skip_check && !self.force_check
    }
}
