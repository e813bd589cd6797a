//! Core signal-processing and protocol stack for a software voiceband
//! modem: V.8 negotiation, V.21/V.23 FSK, DTMF, V.22 DQPSK (modulator
//! only), V.34 trellis-coded QAM and V.90 PCM mapping frames, wired
//! together by a top-level session state machine that a host drives one
//! 8 kHz linear-PCM block at a time.

pub mod audio_generator;
pub mod channel;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod dtmf;
pub mod errors;
pub mod fifo;
pub mod fsk;
pub mod line_interface;
pub mod logging;
pub mod serial;
pub mod session;
pub mod utils;
pub mod v21_v23;
pub mod v22;
pub mod v34;
pub mod v8;
pub mod v90;

pub use config::{LinModemConfig, Parity, SerialConfig, SystemConfig};
pub use errors::{ConfigError, DspError, IoError, ModemError, ProtocolError, Result};
pub use line_interface::{LineInterface, LoopbackLine};
pub use session::{CallState, ModemSession, SessionState};
