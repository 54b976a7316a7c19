// Exit Outcome Domain Model

use std::fmt;

/// Raw termination data of a check process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStatus {
    /// Normal exit with a status code
    Exited(i32),
    /// Terminated by a signal, possibly with a core dump
    Signaled { signal: String, core_dumped: bool },
    /// Neither exit code nor signal could be recovered
    Unknown,
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawStatus::Exited(code) => write!(f, "exit code {}", code),
            RawStatus::Signaled {
                signal,
                core_dumped: true,
            } => write!(f, "signal {} (core dumped)", signal),
            RawStatus::Signaled { signal, .. } => write!(f, "signal {}", signal),
            RawStatus::Unknown => write!(f, "unknown termination"),
        }
    }
}

/// Semantic outcome of one check attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeFlag {
    Repaired,
    RebootRequired,
    Unrepairable,
    OtherError,
}

impl OutcomeFlag {
    const ALL: [OutcomeFlag; 4] = [
        OutcomeFlag::Repaired,
        OutcomeFlag::RebootRequired,
        OutcomeFlag::Unrepairable,
        OutcomeFlag::OtherError,
    ];

    fn bit(self) -> u8 {
        match self {
            OutcomeFlag::Repaired => 1,
            OutcomeFlag::RebootRequired => 1 << 1,
            OutcomeFlag::Unrepairable => 1 << 2,
            OutcomeFlag::OtherError => 1 << 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeFlag::Repaired => "repaired",
            OutcomeFlag::RebootRequired => "reboot-required",
            OutcomeFlag::Unrepairable => "unrepairable",
            OutcomeFlag::OtherError => "other-error",
        }
    }
}

/// Set of outcome flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeFlags(u8);

impl OutcomeFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: OutcomeFlag) {
        self.0 |= flag.bit();
    }

    pub fn contains(&self, flag: OutcomeFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = OutcomeFlag> + '_ {
        OutcomeFlag::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<OutcomeFlag> for OutcomeFlags {
    fn from_iter<I: IntoIterator<Item = OutcomeFlag>>(iter: I) -> Self {
        let mut flags = OutcomeFlags::empty();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl fmt::Display for OutcomeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.iter().map(OutcomeFlag::as_str).collect();
        write!(f, "{}", names.join(","))
    }
}

/// Classified result of one check process
///
/// Derived once from the raw status and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    pub terminated_normally: bool,
    pub exit_code: Option<i32>,
    pub terminating_signal: Option<String>,
    pub core_dumped: bool,
    pub flags: OutcomeFlags,
}

impl ExitOutcome {
    pub fn has(&self, flag: OutcomeFlag) -> bool {
        self.flags.contains(flag)
    }

    /// No failure flags (repairs alone count as success)
    pub fn is_success(&self) -> bool {
        !self.has(OutcomeFlag::RebootRequired)
            && !self.has(OutcomeFlag::Unrepairable)
            && !self.has(OutcomeFlag::OtherError)
    }

    /// Abnormal termination, or any status bit besides "repaired"
    pub fn needs_inspection(&self) -> bool {
        match self.exit_code {
            Some(code) if self.terminated_normally => code & !1 != 0,
            _ => true,
        }
    }

    /// Outcome that the bounded retry/escalation policy must act on
    pub fn requires_escalation(&self) -> bool {
        self.has(OutcomeFlag::RebootRequired) || self.has(OutcomeFlag::Unrepairable)
    }

    /// Short description used in logs and on the takeover console
    pub fn describe(&self) -> String {
        match (&self.terminating_signal, self.exit_code) {
            (Some(signal), _) if self.core_dumped => {
                format!("terminated by signal {} (core dumped)", signal)
            }
            (Some(signal), _) => format!("terminated by signal {}", signal),
            (None, Some(0)) => "completed without errors".to_string(),
            (None, Some(code)) => format!("failed with error code {}", code),
            (None, None) => "failed due to unknown reason".to_string(),
        }
    }
}
