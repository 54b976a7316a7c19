// Check supervision constants (no magic values)
use std::time::Duration;

/// Minimum spacing between two visible progress updates (50ms)
pub const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Longest progress record accepted, without its newline
pub const MAX_PROGRESS_RECORD_LEN: usize = 4096;

/// Generic check front-end invoked for every attempt
pub const DEFAULT_TOOL_PATH: &str = "/sbin/fsck";

/// Do not print the check tool's title line
pub const SCAN_TYPE_FLAG: &str = "-T";

/// Do not check mounted filesystems (everything but the root filesystem)
pub const NON_ROOT_FLAG: &str = "-M";

/// Check even if the filesystem is marked clean
pub const FORCE_FLAG: &str = "-f";

/// Progress pipe flag, followed directly by the descriptor number
pub const PROGRESS_FLAG_PREFIX: &str = "-C";

/// Upper bound on check attempts in one recovery run
/// (two unattended + two interactive)
pub const MAX_ATTEMPTS: usize = 4;

/// Virtual terminal activated for interactive repair
pub const DEFAULT_TARGET_VT: i32 = 8;

/// Process exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// No qualifying console for interactive repair
pub const EXIT_CONSOLE_UNAVAILABLE: u8 = 255;
