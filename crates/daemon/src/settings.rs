//! Layered settings: defaults, TOML file, `BOOTCHECK_*` environment,
//! then the kernel command line.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use bootcheck_core::application::constants::{DEFAULT_TARGET_VT, DEFAULT_TOOL_PATH};
use bootcheck_core::application::KernelOptions;
use bootcheck_core::domain::{CheckConfig, CheckMode, RepairMode};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/bootcheck/bootcheck.toml";
const ENV_PREFIX: &str = "BOOTCHECK";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Check tool front-end
    pub tool_path: PathBuf,
    /// Device that receives progress lines
    pub progress_console: PathBuf,
    /// Touched when a repair happened
    pub quotacheck_marker: PathBuf,
    /// Its presence turns progress display on
    pub show_status_flag: PathBuf,
    /// Terminal switched to for interactive repair
    pub target_vt: i32,
    pub systemctl_path: PathBuf,
    pub cmdline_path: PathBuf,
    /// `auto`, `force` or `skip`
    pub mode: Option<String>,
    /// `preen`, `yes` or `no`
    pub repair: Option<String>,
    pub show_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from(DEFAULT_TOOL_PATH),
            progress_console: PathBuf::from("/dev/console"),
            quotacheck_marker: PathBuf::from("/run/systemd/quotacheck"),
            show_status_flag: PathBuf::from("/run/systemd/show-status"),
            target_vt: DEFAULT_TARGET_VT,
            systemctl_path: PathBuf::from("systemctl"),
            cmdline_path: PathBuf::from("/proc/cmdline"),
            mode: None,
            repair: None,
            show_progress: false,
        }
    }
}

impl Settings {
    /// Load from the config file (`BOOTCHECK_CONFIG` overrides its path)
    /// and the process environment
    pub fn load() -> Self {
        let path = env::var_os("BOOTCHECK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path, None)
    }

    /// `env` replaces the process environment when given
    ///
    /// Keys are read one by one: an invalid value keeps that key's default
    /// and is only logged. An unparseable file keeps all defaults.
    pub fn load_from(path: &Path, env: Option<HashMap<String, String>>) -> Self {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(env);

        let layered = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(environment)
            .build();

        let config = match layered {
            Ok(config) => config,
            Err(e) => {
                warn!(config = %path.display(), error = %e, "Failed to load settings, using defaults");
                return Settings::default();
            }
        };

        let mut settings = Settings::default();
        read_key(&config, "tool_path", &mut settings.tool_path);
        read_key(&config, "progress_console", &mut settings.progress_console);
        read_key(&config, "quotacheck_marker", &mut settings.quotacheck_marker);
        read_key(&config, "show_status_flag", &mut settings.show_status_flag);
        read_key(&config, "target_vt", &mut settings.target_vt);
        read_key(&config, "systemctl_path", &mut settings.systemctl_path);
        read_key(&config, "cmdline_path", &mut settings.cmdline_path);
        read_key(&config, "mode", &mut settings.mode);
        read_key(&config, "repair", &mut settings.repair);
        read_key(&config, "show_progress", &mut settings.show_progress);
        settings
    }

    /// Final check configuration, reading the kernel command line and the
    /// show-status flag from disk
    pub fn check_config(&self) -> CheckConfig {
        let cmdline = match fs::read_to_string(&self.cmdline_path) {
            Ok(cmdline) => Some(cmdline),
            Err(e) => {
                warn!(path = %self.cmdline_path.display(), error = %e, "Failed to read kernel command line");
                None
            }
        };
        let show_status = self.show_status_flag.exists();

        self.resolve(cmdline.as_deref(), show_status)
    }

    /// Combine settings with kernel options; the kernel command line wins
    pub fn resolve(&self, cmdline: Option<&str>, show_status: bool) -> CheckConfig {
        let mode = parse_or_warn::<CheckMode>("mode", self.mode.as_deref()).unwrap_or_default();
        let repair =
            parse_or_warn::<RepairMode>("repair", self.repair.as_deref()).unwrap_or_default();

        let mut config = CheckConfig::new(mode, repair, self.show_progress || show_status);
        if let Some(cmdline) = cmdline {
            config = KernelOptions::parse(cmdline).apply(config);
        }

        debug!(?config, "Resolved check configuration");
        config
    }
}

/// Overwrite `slot` with `key` when present and valid
fn read_key<T: DeserializeOwned>(config: &Config, key: &str, slot: &mut T) {
    match config.get::<T>(key) {
        Ok(value) => *slot = value,
        Err(ConfigError::NotFound(_)) => {}
        Err(e) => warn!(key, error = %e, "Invalid {} setting. Ignoring.", key),
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: Option<&str>) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Invalid {} setting '{}'. Ignoring.", key, value);
            None
        }
    }
}
