// Progress monitor: progress pipe -> shared console
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, info};

use crate::application::constants::{MAX_PROGRESS_RECORD_LEN, PROGRESS_UPDATE_INTERVAL};
use crate::domain::ProgressSample;
use crate::port::{ProgressConsole, ProgressConsoleOpener, TimeProvider};

/// What one monitoring run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// Well-formed records read
    pub samples: usize,
    /// Status lines actually written
    pub rendered: usize,
    /// Whether this monitor held the console lock
    pub locked: bool,
    /// Width of the longest status line (blanked on exit)
    pub widest: usize,
    /// Reading stopped on a malformed record
    pub malformed: bool,
}

/// Console access, acquired lazily on the first sample
enum ConsoleSlot {
    Untried,
    Locked(Box<dyn ProgressConsole>),
    Unavailable,
}

/// Renders rate-limited progress lines for one check attempt
///
/// Several supervisors may run at once (one per filesystem); only the one
/// holding the console lock draws, the others drain their pipes silently.
pub struct ProgressMonitor {
    opener: Arc<dyn ProgressConsoleOpener>,
    clock: Arc<dyn TimeProvider>,
    interval: Duration,
}

impl ProgressMonitor {
    pub fn new(opener: Arc<dyn ProgressConsoleOpener>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            opener,
            clock,
            interval: PROGRESS_UPDATE_INTERVAL,
        }
    }

    /// Read `reader` until end-of-stream, drawing progress on the console
    ///
    /// Never fails: read errors and malformed records end the loop, and
    /// console trouble only suppresses output.
    pub async fn monitor<R>(&self, reader: R) -> MonitorReport
    where
        R: AsyncRead + Unpin,
    {
        let mut report = MonitorReport::default();
        let mut slot = ConsoleSlot::Untried;
        let mut last_update: Option<Duration> = None;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            let line = match read_record(&mut reader, &mut buf).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Progress stream unreadable, stopping");
                    report.malformed = true;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let Some(sample) = ProgressSample::parse(&line) else {
                debug!(record = %line, "Malformed progress record, stopping");
                report.malformed = true;
                break;
            };
            report.samples += 1;

            let Some(console) = self.console(&mut slot) else {
                continue;
            };
            report.locked = true;

            let now = self.clock.monotonic();
            if let Some(previous) = last_update {
                if now < previous + self.interval {
                    continue;
                }
            }
            last_update = Some(now);

            let text = render(&sample);
            if let Err(e) = console.write_text(&text) {
                debug!(error = %e, "Failed to write progress");
                continue;
            }
            report.rendered += 1;
            report.widest = report.widest.max(text.chars().count());
        }

        if let ConsoleSlot::Locked(mut console) = slot {
            if report.widest > 0 {
                let blank = format!("\r{}\r", " ".repeat(report.widest));
                if let Err(e) = console.write_text(&blank) {
                    debug!(error = %e, "Failed to clear progress line");
                }
            }
            // console (and its lock) dropped here
        }

        if report.malformed {
            // Keep the child from blocking on a full pipe
            if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                debug!(error = %e, "Failed to drain progress pipe");
            }
        }

        debug!(
            samples = report.samples,
            rendered = report.rendered,
            locked = report.locked,
            "Progress monitoring finished"
        );
        report
    }

    /// Open and lock the console on first use; remember failure
    fn console<'a>(&self, slot: &'a mut ConsoleSlot) -> Option<&'a mut Box<dyn ProgressConsole>> {
        if let ConsoleSlot::Untried = slot {
            *slot = match self.opener.open() {
                Ok(mut console) => match console.try_lock() {
                    Ok(true) => ConsoleSlot::Locked(console),
                    Ok(false) => {
                        info!("Console progress held by another check, staying quiet");
                        ConsoleSlot::Unavailable
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed to lock console");
                        ConsoleSlot::Unavailable
                    }
                },
                Err(e) => {
                    debug!(error = %e, "Failed to open console for progress");
                    ConsoleSlot::Unavailable
                }
            };
        }

        match slot {
            ConsoleSlot::Locked(console) => Some(console),
            _ => None,
        }
    }
}

/// Next record without its line terminator; `None` at end-of-stream
///
/// Records longer than `MAX_PROGRESS_RECORD_LEN` or not valid UTF-8 are
/// `InvalidData`, so a runaway writer cannot grow the buffer.
async fn read_record<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_PROGRESS_RECORD_LEN as u64 + 1;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_PROGRESS_RECORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "progress record too long",
        ));
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    std::str::from_utf8(buf)
        .map(|s| Some(s.to_string()))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// One status line; leading and trailing `\r` keep the cursor in column 0
fn render(sample: &ProgressSample) -> String {
    format!(
        "\r{}: fsck {:3.1}% complete...\r",
        sample.label,
        sample.percent()
    )
}
