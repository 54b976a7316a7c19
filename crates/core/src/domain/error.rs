// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid recovery state transition from terminal state {0}")]
    TerminalState(String),

    #[error("Empty argument vector")]
    EmptyCommand,

    #[error("Validation error: {0}")]
    ValidationError(String),
}
