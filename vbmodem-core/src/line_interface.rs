//! Hardware abstraction boundary (C13) between a session's sample-driven
//! state machine and whatever actually owns the analog line: a sound
//! card, a loopback buffer in a test, or a simulated channel.
//!
//! `process()` never touches hardware directly. It reads and writes
//! fixed-size sample blocks and asks a `LineInterface` to do the
//! physical off-hook/ring signalling, matching the split between
//! `sm_process` and the platform `line_*` calls in the source.

use crate::errors::{IoError, Result};

/// Everything a session needs from the analog line besides raw samples.
pub trait LineInterface {
    /// Reserve the line for this session. Called once before the first
    /// `process()` call.
    fn open(&mut self) -> Result<()>;

    /// Release the line. Called once the session returns to `IDLE`.
    fn close(&mut self) -> Result<()>;

    /// Assert or release off-hook signalling.
    fn set_offhook(&mut self, offhook: bool) -> Result<()>;

    /// Enable or disable ringer detection/generation, used by the
    /// `TEST_RING`/`TEST_RING2` states.
    fn set_ring(&mut self, ring: bool) -> Result<()>;

    /// True if the line is currently reporting an incoming ring.
    fn ringing(&self) -> bool;
}

/// In-process line, useful for tests and loopback demos: no physical
/// signalling, just bookkeeping of the requested state.
#[derive(Debug, Clone, Default)]
pub struct LoopbackLine {
    open: bool,
    offhook: bool,
    ring_enabled: bool,
    ring_pending: bool,
}

impl LoopbackLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: simulate an incoming ring the next time `ringing()` is
    /// polled while ring detection is enabled.
    pub fn inject_ring(&mut self) {
        self.ring_pending = true;
    }

    pub fn is_offhook(&self) -> bool {
        self.offhook
    }
}

impl LineInterface for LoopbackLine {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(IoError::OpenFailed.into());
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(IoError::CloseFailed.into());
        }
        self.open = false;
        self.offhook = false;
        Ok(())
    }

    fn set_offhook(&mut self, offhook: bool) -> Result<()> {
        if !self.open {
            return Err(IoError::OffHookFailed.into());
        }
        self.offhook = offhook;
        Ok(())
    }

    fn set_ring(&mut self, ring: bool) -> Result<()> {
        self.ring_enabled = ring;
        Ok(())
    }

    fn ringing(&self) -> bool {
        self.ring_enabled && self.ring_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_round_trips() {
        let mut line = LoopbackLine::new();
        line.open().unwrap();
        line.set_offhook(true).unwrap();
        assert!(line.is_offhook());
        line.close().unwrap();
        assert!(!line.is_offhook());
    }

    #[test]
    fn double_open_fails() {
        let mut line = LoopbackLine::new();
        line.open().unwrap();
        assert!(line.open().is_err());
    }

    #[test]
    fn offhook_before_open_fails() {
        let mut line = LoopbackLine::new();
        assert!(line.set_offhook(true).is_err());
    }

    #[test]
    fn ring_only_reported_when_enabled() {
        let mut line = LoopbackLine::new();
        line.open().unwrap();
        line.inject_ring();
        assert!(!line.ringing());
        line.set_ring(true).unwrap();
        assert!(line.ringing());
    }
}
