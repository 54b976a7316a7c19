// Domain Layer - Pure check-supervision entities

pub mod config;
pub mod error;
pub mod invocation;
pub mod outcome;
pub mod progress;
pub mod state;
pub mod target;

// Re-exports
pub use config::{CheckConfig, CheckMode, RepairMode};
pub use error::DomainError;
pub use invocation::CheckInvocation;
pub use outcome::{ExitOutcome, OutcomeFlag, OutcomeFlags, RawStatus};
pub use progress::{percent, ProgressSample};
pub use state::{Escalation, RecoveryState, Stage};
pub use target::CheckTarget;
