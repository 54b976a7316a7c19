// Recovery State Domain Model

use std::fmt;

use super::error::DomainError;
use super::outcome::{ExitOutcome, OutcomeFlag};

/// External system action requested when repair cannot complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Reboot,
    Emergency,
}

impl Escalation {
    /// System-manager target started for this escalation
    pub fn target(self) -> &'static str {
        match self {
            Escalation::Reboot => "reboot.target",
            Escalation::Emergency => "emergency.target",
        }
    }
}

/// Who is watching an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Normal boot, no operator involvement
    Unattended,
    /// Forced repair shown on a taken-over console
    Interactive,
}

/// Recovery state machine position
///
/// Each retry is its own state, so the number of attempts is bounded by
/// the transition table itself: two unattended, two interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Initial,
    AutoRetry,
    ConsoleRepair,
    ConsoleRetry,
    Escalated(Escalation),
    Done,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryState::Initial => write!(f, "INITIAL"),
            RecoveryState::AutoRetry => write!(f, "AUTO_RETRY"),
            RecoveryState::ConsoleRepair => write!(f, "CONSOLE_REPAIR"),
            RecoveryState::ConsoleRetry => write!(f, "CONSOLE_RETRY"),
            RecoveryState::Escalated(Escalation::Reboot) => write!(f, "ESCALATED(REBOOT)"),
            RecoveryState::Escalated(Escalation::Emergency) => write!(f, "ESCALATED(EMERGENCY)"),
            RecoveryState::Done => write!(f, "DONE"),
        }
    }
}

impl RecoveryState {
    /// Stage of the attempt run in this state (`None` when terminal)
    pub fn stage(self) -> Option<Stage> {
        match self {
            RecoveryState::Initial | RecoveryState::AutoRetry => Some(Stage::Unattended),
            RecoveryState::ConsoleRepair | RecoveryState::ConsoleRetry => Some(Stage::Interactive),
            RecoveryState::Escalated(_) | RecoveryState::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.stage().is_none()
    }

    /// Transition on the outcome of the attempt run in this state
    ///
    /// At the interactive stage an unrepairable outcome wins over a reboot
    /// request: nothing a reboot could fix is left to try.
    pub fn advance(self, outcome: &ExitOutcome) -> Result<RecoveryState, DomainError> {
        let next = match self {
            RecoveryState::Initial if outcome.requires_escalation() => RecoveryState::AutoRetry,
            RecoveryState::AutoRetry if outcome.requires_escalation() => {
                RecoveryState::ConsoleRepair
            }
            RecoveryState::Initial | RecoveryState::AutoRetry => RecoveryState::Done,

            RecoveryState::ConsoleRepair | RecoveryState::ConsoleRetry
                if outcome.has(OutcomeFlag::Unrepairable) =>
            {
                RecoveryState::Escalated(Escalation::Emergency)
            }
            RecoveryState::ConsoleRepair if outcome.has(OutcomeFlag::RebootRequired) => {
                RecoveryState::ConsoleRetry
            }
            RecoveryState::ConsoleRetry if outcome.has(OutcomeFlag::RebootRequired) => {
                RecoveryState::Escalated(Escalation::Reboot)
            }
            RecoveryState::ConsoleRepair | RecoveryState::ConsoleRetry => RecoveryState::Done,

            RecoveryState::Escalated(_) | RecoveryState::Done => {
                return Err(DomainError::TerminalState(self.to_string()))
            }
        };
        Ok(next)
    }
}
