//! CLI-specific configuration: logging target/format/level plus the
//! channel parameters used by the `-s` line-simulator test.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level CLI configuration. Loaded from defaults; individual fields
/// are overridden by command-line flags in `main`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Parameters for the in-process line-simulator test (`-s`): a pair of
/// loopback sessions connected through an AWGN channel rather than real
/// line hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,

    #[serde(default = "default_attenuation")]
    pub attenuation: f64,

    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,

    #[serde(default = "default_dial_number")]
    pub dial_number: String,
}

fn default_noise_std() -> f64 {
    40.0
}

fn default_attenuation() -> f64 {
    0.9
}

fn default_max_blocks() -> usize {
    4000
}

fn default_dial_number() -> String {
    "5551234".to_string()
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            noise_std: default_noise_std(),
            attenuation: default_attenuation(),
            max_blocks: default_max_blocks(),
            dial_number: default_dial_number(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_target")]
    pub target: LogTarget,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_target() -> LogTarget {
    LogTarget::Stdout
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            file_path: None,
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Convert CLI logging config to the core's subsystem filter config.
    pub fn to_core_log_config(&self) -> vbmodem_core::logging::LogConfig {
        use vbmodem_core::logging::{LogConfig as CoreLogConfig, LogLevel as CoreLogLevel};

        let level = match self.level {
            LogLevel::Debug => CoreLogLevel::Debug,
            LogLevel::Info => CoreLogLevel::Info,
            LogLevel::Warn => CoreLogLevel::Warn,
            LogLevel::Error => CoreLogLevel::Error,
        };

        CoreLogConfig {
            level,
            enable_timing: true,
            enable_carrier: true,
            enable_framing: true,
            enable_negotiation: true,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stdout_pretty_info() {
        let config = CliConfig::default();
        assert_eq!(config.logging.target, LogTarget::Stdout);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn simulator_defaults_are_usable() {
        let config = SimulatorConfig::default();
        assert!(config.noise_std > 0.0);
        assert!(config.attenuation > 0.0 && config.attenuation <= 1.0);
        assert!(!config.dial_number.is_empty());
    }
}
