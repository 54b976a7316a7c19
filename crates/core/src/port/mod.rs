// Port Layer - Interfaces for external collaborators

pub mod checker;
pub mod console;
pub mod device;
pub mod marker;
pub mod process;
pub mod system_manager;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use checker::{CheckerLocator, LocatorError};
pub use console::{
    ConsoleError, ConsoleProvider, ConsoleSession, ProgressConsole, ProgressConsoleOpener,
};
pub use device::{DeviceResolver, ResolutionError, RootDevice};
pub use marker::MarkerStore;
pub use process::{ProcessSupervisor, ProgressPipe, SupervisorError};
pub use system_manager::{ManagerError, SystemManager};
pub use time_provider::TimeProvider;
