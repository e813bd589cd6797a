//! Modem error types with granular categories, mirroring the taxonomy in
//! the error-handling design: configuration is fatal at init, hardware I/O
//! is fatal for the session, protocol timeouts are handled locally, and
//! framing/demodulation faults are absorbed rather than surfaced.

use thiserror::Error;

/// Top-level error type for all modem operations.
#[derive(Debug, Error)]
pub enum ModemError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("hardware I/O error: {0}")]
    Io(#[from] IoError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("DSP processing error: {0}")]
    Dsp(#[from] DspError),
}

/// Configuration errors: fatal at session or pump init.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported modulation mask: 0x{mask:04x}")]
    UnsupportedModulationMask { mask: u32 },

    #[error("invalid V.34 symbol-rate row index {index}")]
    InvalidV34SymbolRate { index: usize },

    #[error("precoder coefficient overflow: {value} exceeds Q14 range")]
    PrecoderCoefficientOverflow { value: i64 },

    #[error("invalid async-serial word shape: data_bits={data_bits}")]
    InvalidSerialShape { data_bits: u8 },

    #[error("invalid dial string: {reason}")]
    InvalidDialString { reason: String },
}

/// Hardware I/O errors: fatal for the session, surfaced through `process`
/// returning with state IDLE after the session flushes its FIFOs.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("line interface failed to open")]
    OpenFailed,

    #[error("line interface failed to close cleanly")]
    CloseFailed,

    #[error("off-hook signalling failed")]
    OffHookFailed,
}

/// Protocol-terminal errors: handled locally by transitioning to
/// `GO_ONHOOK`, never unwound across a `process()` boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("V.8 negotiation exhausted {attempts} CI retries with no ANSam")]
    V8CiRetriesExhausted { attempts: u32 },

    #[error("V.8 negotiation timed out waiting for JM after {elapsed_samples} samples")]
    V8JmTimeout { elapsed_samples: u64 },

    #[error("no common modulation between local mask 0x{local:04x} and peer mask 0x{peer:04x}")]
    NoCommonModulation { local: u32, peer: u32 },

    #[error("a dial or receive attempt is already in progress")]
    Busy,

    #[error("session is already idle")]
    AlreadyIdle,
}

/// DSP-internal errors. Numerical faults (overflow, clamps, drift) are
/// absorbed by saturation arithmetic inside the adaptive loops and never
/// reach this type; it exists for the handful of cases that are
/// programmer errors rather than channel conditions.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("FFT size {size} is not a power of 2")]
    InvalidFftSize { size: usize },

    #[error("shell-mapping parameters out of range: K={k}, m={m}")]
    InvalidShellParams { k: u32, m: u32 },

    #[error("trellis state count {states} is not one of 16/32/64")]
    InvalidTrellisStateCount { states: usize },
}

/// Result type alias for modem operations.
pub type Result<T> = std::result::Result<T, ModemError>;
