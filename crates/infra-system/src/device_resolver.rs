// Block device resolution through sysfs and the udev database
use std::fs;
use std::path::{Path, PathBuf};

use nix::sys::stat::{major, minor, stat, SFlag};
use tracing::debug;

use bootcheck_core::domain::CheckTarget;
use bootcheck_core::port::{DeviceResolver, ResolutionError, RootDevice};

const SYSFS_BLOCK_ROOT: &str = "/sys/dev/block";
const UDEV_DATA_ROOT: &str = "/run/udev/data";

pub struct SysfsDeviceResolver {
    root_mount: PathBuf,
    sysfs_root: PathBuf,
    udev_root: PathBuf,
}

impl SysfsDeviceResolver {
    pub fn new() -> Self {
        Self::with_roots("/", SYSFS_BLOCK_ROOT, UDEV_DATA_ROOT)
    }

    pub fn with_roots(
        root_mount: impl Into<PathBuf>,
        sysfs_root: impl Into<PathBuf>,
        udev_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root_mount: root_mount.into(),
            sysfs_root: sysfs_root.into(),
            udev_root: udev_root.into(),
        }
    }

    /// Device node and filesystem type for a major:minor pair
    fn target_for(
        &self,
        major: u64,
        minor: u64,
        is_root: bool,
    ) -> Result<CheckTarget, ResolutionError> {
        let id = format!("{}:{}", major, minor);

        let uevent = fs::read_to_string(self.sysfs_root.join(&id).join("uevent"))
            .map_err(|_| ResolutionError::UnknownDevice(id.clone()))?;
        let name = uevent
            .lines()
            .find_map(|line| line.strip_prefix("DEVNAME="))
            .ok_or_else(|| ResolutionError::NoDeviceNode(id.clone()))?;

        let node = if name.starts_with('/') {
            PathBuf::from(name)
        } else {
            Path::new("/dev").join(name)
        };

        let fs_type = self.filesystem_type(&id);
        debug!(device = %node.display(), fs_type = ?fs_type, "Resolved block device {}", id);

        Ok(CheckTarget::new(node, is_root, fs_type))
    }

    /// Filesystem type as probed by udev, if recorded
    fn filesystem_type(&self, id: &str) -> Option<String> {
        let data = fs::read_to_string(self.udev_root.join(format!("b{}", id))).ok()?;
        data.lines()
            .find_map(|line| line.strip_prefix("E:ID_FS_TYPE="))
            .map(str::to_string)
    }
}

impl Default for SysfsDeviceResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn stat_error(path: &Path, e: nix::errno::Errno) -> ResolutionError {
    ResolutionError::Stat {
        path: path.display().to_string(),
        reason: e.desc().to_string(),
    }
}

impl DeviceResolver for SysfsDeviceResolver {
    fn resolve_root(&self) -> Result<RootDevice, ResolutionError> {
        let st = stat(self.root_mount.as_path()).map_err(|e| stat_error(&self.root_mount, e))?;

        // Anonymous devices (tmpfs, overlay, btrfs subvolumes) have major 0
        if major(st.st_dev) == 0 {
            debug!("Root directory is virtual or btrfs, skipping check");
            return Ok(RootDevice::Virtual);
        }

        self.target_for(major(st.st_dev), minor(st.st_dev), true)
            .map(RootDevice::Block)
    }

    fn resolve_device(&self, path: &Path) -> Result<CheckTarget, ResolutionError> {
        let st = stat(path).map_err(|e| stat_error(path, e))?;

        let kind = SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT;
        if kind != SFlag::S_IFBLK {
            return Err(ResolutionError::UnknownDevice(format!(
                "{} is not a block device",
                path.display()
            )));
        }

        let target = self.target_for(major(st.st_rdev), minor(st.st_rdev), false)?;
        // Keep the name the caller used
        Ok(CheckTarget::new(
            path,
            false,
            target.filesystem_type().map(str::to_string),
        ))
    }
}
