// Central Error Type for the Application

use thiserror::Error;

use crate::application::constants::{EXIT_CONSOLE_UNAVAILABLE, EXIT_FAILURE};

/// Application-level error type
///
/// Every variant is fatal for the current run. Recoverable conditions
/// (bad option values, lock contention, malformed progress records,
/// ignored check failures) never surface as an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] crate::port::ResolutionError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] crate::port::SupervisorError),

    #[error("Console error: {0}")]
    Console(#[from] crate::port::ConsoleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Process exit code for this failure
    ///
    /// A missing interactive console gets its own code so boot tooling can
    /// tell "nobody could be asked" apart from an ordinary failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Console(crate::port::ConsoleError::Unavailable) => EXIT_CONSOLE_UNAVAILABLE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{ConsoleError, SupervisorError};

    #[test]
    fn test_console_unavailable_has_distinct_exit_code() {
        let err = AppError::from(ConsoleError::Unavailable);
        assert_eq!(err.exit_code(), EXIT_CONSOLE_UNAVAILABLE);
        assert_ne!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_spawn_failure_is_plain_failure() {
        let err = AppError::from(SupervisorError::Spawn("no such file".to_string()));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(err.to_string().contains("no such file"));
    }
}
