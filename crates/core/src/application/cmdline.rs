// Kernel command line options (fsck.mode=, fsck.repair=)

use tracing::warn;

use crate::domain::{CheckConfig, CheckMode, RepairMode};

/// Check options found on the kernel command line
///
/// Unknown values are reported as warnings and ignored. Every valid
/// `fsck.mode=` is kept in order; for `fsck.repair=` the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelOptions {
    pub modes: Vec<CheckMode>,
    pub repair: Option<RepairMode>,
    pub warnings: Vec<String>,
}

impl KernelOptions {
    pub fn parse(cmdline: &str) -> Self {
        let mut options = KernelOptions::default();

        for word in split_words(cmdline) {
            let Some((key, value)) = word.split_once('=') else {
                continue;
            };

            match key {
                "fsck.mode" => match value.parse::<CheckMode>() {
                    Ok(mode) => options.modes.push(mode),
                    Err(_) => options.warn(format!(
                        "Invalid fsck.mode= parameter '{}'. Ignoring.",
                        value
                    )),
                },
                "fsck.repair" => match value.parse::<RepairMode>() {
                    Ok(repair) => options.repair = Some(repair),
                    Err(_) => options.warn(format!(
                        "Invalid fsck.repair= parameter '{}'. Ignoring.",
                        value
                    )),
                },
                _ => {}
            }
        }

        options
    }

    /// Layer these options over `config`
    pub fn apply(&self, config: CheckConfig) -> CheckConfig {
        let mut config = self
            .modes
            .iter()
            .fold(config, |config, mode| config.with_mode(*mode));
        if let Some(repair) = self.repair {
            config.repair_mode = repair;
        }
        config
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Split on whitespace, keeping double-quoted sections together
fn split_words(cmdline: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in cmdline.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
