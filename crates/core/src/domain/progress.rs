// Progress Sample Domain Model

/// Completion percentage reached at the end of each pass (e2fsck weights)
const PASS_TABLE: [f64; 6] = [0.0, 70.0, 90.0, 92.0, 95.0, 100.0];

/// One record read from the progress pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSample {
    pub pass: i32,
    pub current: u64,
    pub maximum: u64,
    pub label: String,
}

impl ProgressSample {
    /// Parse `<pass> <current> <maximum> <device>`
    ///
    /// Returns `None` for anything that is not exactly four fields of the
    /// right types.
    pub fn parse(record: &str) -> Option<Self> {
        let mut fields = record.split_whitespace();
        let pass = fields.next()?.parse().ok()?;
        let current = fields.next()?.parse().ok()?;
        let maximum = fields.next()?.parse().ok()?;
        let label = fields.next()?.to_string();
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            pass,
            current,
            maximum,
            label,
        })
    }

    pub fn percent(&self) -> f64 {
        percent(self.pass, self.current, self.maximum)
    }
}

/// Weighted overall completion for a position inside a pass
pub fn percent(pass: i32, current: u64, maximum: u64) -> f64 {
    if pass <= 0 {
        return 0.0;
    }

    let pass = pass as usize;
    if pass >= PASS_TABLE.len() || maximum == 0 {
        return 100.0;
    }

    let low = PASS_TABLE[pass - 1];
    let high = PASS_TABLE[pass];
    low + (high - low) * current as f64 / maximum as f64
}
