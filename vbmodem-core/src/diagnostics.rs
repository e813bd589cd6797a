//! Per-block diagnostic snapshots a host can collect for a CLI `-v` dump
//! or a test assertion, without the data pumps themselves depending on
//! any particular reporting format.

use serde::{Deserialize, Serialize};

use crate::session::{CallState, SessionState};

/// One block's worth of session-level diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlockDiagnostics {
    pub clock_samples: u64,
    pub state: Option<String>,
    pub call_state: Option<String>,
    pub tx_fifo_fill: usize,
    pub rx_fifo_fill: usize,
}

impl BlockDiagnostics {
    pub fn capture(
        clock_samples: u64,
        state: SessionState,
        call_state: CallState,
        tx_fifo_fill: usize,
        rx_fifo_fill: usize,
    ) -> Self {
        Self {
            clock_samples,
            state: Some(format!("{state:?}")),
            call_state: Some(format!("{call_state:?}")),
            tx_fifo_fill,
            rx_fifo_fill,
        }
    }
}

/// Accumulates per-block diagnostics across a session's lifetime for a
/// verbose CLI run or a test assertion over the whole call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsBundle {
    pub blocks: Vec<BlockDiagnostics>,
}

impl DiagnosticsBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: BlockDiagnostics) {
        self.blocks.push(block);
    }

    pub fn state_transitions(&self) -> Vec<String> {
        let mut transitions = Vec::new();
        let mut last: Option<&str> = None;
        for block in &self.blocks {
            if let Some(state) = block.state.as_deref() {
                if last != Some(state) {
                    transitions.push(state.to_string());
                    last = Some(state);
                }
            }
        }
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_collapses_repeats() {
        let mut bundle = DiagnosticsBundle::new();
        bundle.push(BlockDiagnostics::capture(0, SessionState::Idle, CallState::Idle, 0, 0));
        bundle.push(BlockDiagnostics::capture(40, SessionState::Idle, CallState::Idle, 0, 0));
        bundle.push(BlockDiagnostics::capture(80, SessionState::Call, CallState::Connecting, 0, 0));
        assert_eq!(bundle.state_transitions(), vec!["Idle", "Call"]);
    }
}
