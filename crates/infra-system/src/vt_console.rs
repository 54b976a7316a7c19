// Virtual terminal console takeover
// reason: nix ioctl macros for KDGKBTYPE / VT_ACTIVATE, dup/dup2 for stdout redirection
use std::ffi::c_char;
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::sys::ioctl::ioctl_num_type;
use nix::unistd::{dup, dup2};
use tracing::{debug, error, info, warn};

use bootcheck_core::port::{ConsoleError, ConsoleProvider, ConsoleSession};

/// Candidate console endpoints, tried in order
pub const CONSOLE_CANDIDATES: [&str; 6] = [
    "/proc/self/fd/0",
    "/dev/tty",
    "/dev/tty0",
    "/dev/vc/0",
    "/dev/systty",
    "/dev/console",
];

const KDGKBTYPE: ioctl_num_type = 0x4B33;
const VT_ACTIVATE: ioctl_num_type = 0x5606;

/// Keyboard types reported by real (virtual-terminal) consoles
const KB_84: u8 = 0x01;
const KB_101: u8 = 0x02;

nix::ioctl_read_bad!(kd_get_kb_type, KDGKBTYPE, c_char);
nix::ioctl_write_int_bad!(vt_activate, VT_ACTIVATE);

/// Probing primitives, separated from the search order for testing
pub(crate) trait ConsoleProbe {
    type Handle;

    fn open(&self, path: &Path) -> Option<Self::Handle>;

    /// Duplicate one of the standard descriptors (0-2)
    fn standard(&self, fd: RawFd) -> Option<Self::Handle>;

    /// Terminal with a recognized keyboard type
    fn qualifies(&self, handle: &Self::Handle) -> bool;
}

pub(crate) struct Located<H> {
    pub handle: H,
    pub path: PathBuf,
}

/// First qualifying console: named candidates, then stdin/stdout/stderr
///
/// Non-qualifying handles are closed as they are skipped.
pub(crate) fn locate<P: ConsoleProbe>(
    probe: &P,
    candidates: &[PathBuf],
) -> Option<Located<P::Handle>> {
    for path in candidates {
        if let Some(handle) = probe.open(path) {
            if probe.qualifies(&handle) {
                return Some(Located {
                    handle,
                    path: path.clone(),
                });
            }
            debug!(path = %path.display(), "Not a console");
        }
    }

    for fd in 0..3 {
        if let Some(handle) = probe.standard(fd) {
            if probe.qualifies(&handle) {
                return Some(Located {
                    handle,
                    path: PathBuf::from(format!("/proc/self/fd/{}", fd)),
                });
            }
        }
    }

    None
}

/// Probe backed by real device nodes
struct DeviceProbe;

impl ConsoleProbe for DeviceProbe {
    type Handle = OwnedFd;

    fn open(&self, path: &Path) -> Option<OwnedFd> {
        // Any access mode will do for the ioctls
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .or_else(|_| OpenOptions::new().write(true).open(path))
            .or_else(|_| OpenOptions::new().read(true).open(path))
            .ok()?;
        Some(file.into())
    }

    fn standard(&self, fd: RawFd) -> Option<OwnedFd> {
        let duplicate = dup(fd).ok()?;
        // SAFETY: `duplicate` was just returned by dup(2) and nothing else owns it
        Some(unsafe { OwnedFd::from_raw_fd(duplicate) })
    }

    fn qualifies(&self, handle: &OwnedFd) -> bool {
        if !handle.is_terminal() {
            return false;
        }

        let mut kb_type: c_char = 0;
        // SAFETY: KDGKBTYPE stores a single char through the pointer
        let queried = unsafe { kd_get_kb_type(handle.as_raw_fd(), &mut kb_type) }.is_ok();
        queried && matches!(kb_type as u8, KB_84 | KB_101)
    }
}

/// Takes over a virtual terminal for interactive repair
pub struct VtConsoleProvider {
    candidates: Vec<PathBuf>,
    target_vt: i32,
}

impl VtConsoleProvider {
    pub fn new(target_vt: i32) -> Self {
        Self::with_candidates(
            CONSOLE_CANDIDATES.iter().map(PathBuf::from).collect(),
            target_vt,
        )
    }

    pub fn with_candidates(candidates: Vec<PathBuf>, target_vt: i32) -> Self {
        Self {
            candidates,
            target_vt,
        }
    }
}

impl ConsoleProvider for VtConsoleProvider {
    fn acquire(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError> {
        let Located { handle, path } = locate(&DeviceProbe, &self.candidates).ok_or_else(|| {
            error!("Couldn't get a file descriptor referring to the console");
            ConsoleError::Unavailable
        })?;

        // SAFETY: VT_ACTIVATE takes the terminal number by value
        if let Err(e) = unsafe { vt_activate(handle.as_raw_fd(), self.target_vt) } {
            warn!(vt = self.target_vt, error = %e, "chvt {}: VT_ACTIVATE failed", self.target_vt);
        }

        let stdout_redirected = match redirect_stdout(&path) {
            Ok(()) => true,
            Err(e) => {
                error!(device = %path.display(), error = %e, "Failed to redirect output to console");
                false
            }
        };

        info!(device = %path.display(), vt = self.target_vt, "Console acquired");
        Ok(Box::new(VtConsoleSession {
            device: path,
            handle: File::from(handle),
            stdout_redirected,
        }))
    }
}

/// Point the process's stdout at `path`
fn redirect_stdout(path: &Path) -> io::Result<()> {
    let device = OpenOptions::new().write(true).open(path)?;
    io::stdout().flush()?;
    dup2(device.as_raw_fd(), io::stdout().as_raw_fd())?;
    Ok(())
}

/// Session on a taken-over console; closing the handle releases it
pub struct VtConsoleSession {
    device: PathBuf,
    handle: File,
    stdout_redirected: bool,
}

impl ConsoleSession for VtConsoleSession {
    fn device(&self) -> &Path {
        &self.device
    }

    fn announce(&mut self, text: &str) -> io::Result<()> {
        if self.stdout_redirected {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()
        } else {
            self.handle.write_all(text.as_bytes())?;
            self.handle.flush()
        }
    }
}
