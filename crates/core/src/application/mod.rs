// Application Layer - Check supervision use cases

pub mod classify;
pub mod cmdline;
pub mod command;
pub mod constants;
pub mod progress;
pub mod recovery;
pub mod session;

// Re-exports
pub use classify::classify;
pub use cmdline::KernelOptions;
pub use command::CommandBuilder;
pub use progress::{MonitorReport, ProgressMonitor};
pub use recovery::{AttemptRecord, RecoveryReport, RecoveryStateMachine};
pub use session::{CheckSession, SessionReport, SkipReason};
