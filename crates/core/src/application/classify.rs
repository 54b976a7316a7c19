// Exit status classification
//
// The check tool's exit code is a bitmask (fsck(8) convention):
//   1 = errors corrected, 2 = reboot required, 4 = errors left uncorrected,
//   8 = operational error, 16 = usage error, 32 = cancelled, 128 = library error

use tracing::debug;

use crate::domain::{ExitOutcome, OutcomeFlag, OutcomeFlags, RawStatus};

pub const EXIT_REPAIRED: i32 = 1;
pub const EXIT_REBOOT_REQUIRED: i32 = 2;
pub const EXIT_UNREPAIRABLE: i32 = 4;

/// Bits with a dedicated flag; everything else is an `OtherError`
const KNOWN_BITS: i32 = EXIT_REPAIRED | EXIT_REBOOT_REQUIRED | EXIT_UNREPAIRABLE;

/// Map raw termination data onto outcome flags
///
/// Pure: flags come from the exit code or signal only.
pub fn classify(raw: &RawStatus) -> ExitOutcome {
    let outcome = match raw {
        RawStatus::Exited(code) => {
            let mut flags = OutcomeFlags::empty();
            if code & EXIT_REPAIRED != 0 {
                flags.insert(OutcomeFlag::Repaired);
            }
            if code & EXIT_REBOOT_REQUIRED != 0 {
                flags.insert(OutcomeFlag::RebootRequired);
            }
            if code & EXIT_UNREPAIRABLE != 0 {
                flags.insert(OutcomeFlag::Unrepairable);
            }
            if code & !KNOWN_BITS != 0 {
                flags.insert(OutcomeFlag::OtherError);
            }
            ExitOutcome {
                terminated_normally: true,
                exit_code: Some(*code),
                terminating_signal: None,
                core_dumped: false,
                flags,
            }
        }
        RawStatus::Signaled {
            signal,
            core_dumped,
        } => ExitOutcome {
            terminated_normally: false,
            exit_code: None,
            terminating_signal: Some(signal.clone()),
            core_dumped: *core_dumped,
            flags: [OutcomeFlag::OtherError].into_iter().collect(),
        },
        RawStatus::Unknown => ExitOutcome {
            terminated_normally: false,
            exit_code: None,
            terminating_signal: None,
            core_dumped: false,
            flags: [OutcomeFlag::OtherError].into_iter().collect(),
        },
    };

    debug!(raw = %raw, flags = %outcome.flags, "Classified check status");
    outcome
}
