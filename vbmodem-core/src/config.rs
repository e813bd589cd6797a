//! Configuration types for the modem session and its data pumps.

use serde::{Deserialize, Serialize};

/// Fixed system-wide constants. The wire-level contract mandates 8 kHz,
/// 16-bit linear PCM in both directions; nothing in this crate varies the
/// sample rate per session.
pub struct SystemConfig;

impl SystemConfig {
    pub const SAMPLE_RATE: usize = 8_000;
    /// Default block size: 40 samples = 5 ms at 8 kHz, matching the source.
    pub const DEFAULT_BLOCK_SAMPLES: usize = 40;
}

/// Serial parity mode for asynchronous start/stop framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Asynchronous-serial word shape shared by every data pump: `data_bits`
/// data bits, an optional parity bit, one start bit and one stop bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub data_bits: u8,
    pub parity: Parity,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            data_bits: 8,
            parity: Parity::None,
        }
    }
}

impl SerialConfig {
    pub fn use_parity(&self) -> bool {
        self.parity != Parity::None
    }

    pub fn wordsize(&self) -> usize {
        self.data_bits as usize + 2 + self.use_parity() as usize
    }
}

/// Bitmask of modulations a session is willing to negotiate, matching the
/// V.8 `MODN0`/`MODN2` octet layout so masks round-trip through CM/JM
/// payloads without translation.
pub mod modulation_mask {
    pub const V90: u32 = 1 << 0;
    pub const V34: u32 = 1 << 1;
    pub const V23: u32 = 1 << 10;
    pub const V21: u32 = 1 << 12;
    pub const HANGUP: u32 = 0x8000;
}

/// User-facing modem configuration registers, matching `LinModemConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinModemConfig {
    /// Default dial type: pulse if true, DTMF tone dial otherwise.
    pub pulse_dial: bool,
    /// DTMF transmit level, in dB relative to full scale.
    pub dtmf_level_db: f64,
    pub dtmf_digit_ms: u32,
    pub dtmf_pause_ms: u32,
    /// Mask of modulations this session will offer during V.8 negotiation.
    pub available_modulations_mask: u32,
}

impl Default for LinModemConfig {
    fn default() -> Self {
        Self {
            pulse_dial: false,
            dtmf_level_db: -10.0,
            dtmf_digit_ms: 150,
            dtmf_pause_ms: 100,
            available_modulations_mask: modulation_mask::V21
                | modulation_mask::V23
                | modulation_mask::V34,
        }
    }
}
