//! Verbosity-gated diagnostic lines.
//!
//! Components call [`Diagnostics::log`] with a level; lines above the
//! configured verbosity are dropped before formatting. Accepted lines become
//! `tracing` events, so the subscriber decides where they go and stamps them.

use std::fmt;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    verbosity: u8,
}

impl Diagnostics {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// Whether a line at `level` would be emitted.
    pub fn enabled(&self, level: u8) -> bool {
        level >= 1 && level <= self.verbosity
    }

    /// Emit `args` when `level` is within the configured verbosity.
    ///
    /// Level 1 maps to `debug`, anything higher to `trace`.
    pub fn log(&self, level: u8, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        if level == 1 {
            debug!("{}", args);
        } else {
            trace!("{}", args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating() {
        let quiet = Diagnostics::new(0);
        assert!(!quiet.enabled(1));

        let d = Diagnostics::new(1);
        assert!(d.enabled(1));
        assert!(!d.enabled(2));
        assert!(!d.enabled(0));

        // Must not panic with or without a subscriber.
        d.log(1, format_args!("worksheet {}", 3));
        d.log(2, format_args!("dropped"));
    }
}
