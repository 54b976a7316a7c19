// Bootcheck Infrastructure - System Adapters
// Implements: ProcessSupervisor, ConsoleProvider, ProgressConsoleOpener,
// DeviceResolver, CheckerLocator, MarkerStore, SystemManager

pub mod checker_locator;
pub mod device_resolver;
pub mod marker_store;
pub mod progress_console;
pub mod subprocess_supervisor;
pub mod systemctl_manager;
pub mod vt_console;

pub use checker_locator::PathCheckerLocator;
pub use device_resolver::SysfsDeviceResolver;
pub use marker_store::FileMarkerStore;
pub use progress_console::DevConsoleOpener;
pub use subprocess_supervisor::SubprocessSupervisor;
pub use systemctl_manager::SystemctlManager;
pub use vt_console::VtConsoleProvider;
