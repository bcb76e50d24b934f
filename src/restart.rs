//! Restart escalation after unrecoverable failures.

use crate::error::Error;

/// Exit status used by [`ProcessRestart`].
///
/// `EX_TEMPFAIL` from sysexits.h; supervisors such as systemd
/// (`Restart=on-failure`) restart the process on any non-zero status.
pub const RESTART_EXIT_CODE: i32 = 75;

/// Hard-reset capability invoked when the network stack is unusable.
///
/// Real implementations do not return. The poll loop stops polling after
/// calling [`Restart::restart`] regardless.
pub trait Restart {
    /// Restart the device or process because of `cause`.
    fn restart(&self, cause: &Error);
}

/// Exits the process so its supervisor starts a fresh one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRestart;

impl Restart for ProcessRestart {
    fn restart(&self, cause: &Error) {
        tracing::error!("Resetting after fatal error: {}", cause);
        std::process::exit(RESTART_EXIT_CODE);
    }
}
