//! Structured event logging for the CLI harness: JSON, logfmt or pretty
//! output to stdout, stderr or a file, independent of the core's
//! in-memory `SignalLogger` (which is for embedding hosts, not terminals).

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Structured log event types emitted by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// A session moved from one `SessionState` to another.
    Transition(TransitionEvent),

    /// A call or modulation test reached a terminal outcome.
    Summary(SummaryEvent),

    /// General info message.
    Info { message: String },

    /// Warning message.
    Warn { message: String },

    /// Error message.
    Error { message: String, details: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub timestamp: DateTime<Utc>,
    pub clock_samples: u64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEvent {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub blocks_processed: usize,
    pub final_state: String,
    pub final_call_state: String,
    pub bytes_exchanged: usize,
}

/// Logger that writes structured events to a configured target and
/// format.
pub struct StructuredLogger {
    config: LoggingConfig,
    writer: Box<dyn Write + Send>,
    start_time: DateTime<Utc>,
}

impl StructuredLogger {
    pub fn new(config: LoggingConfig) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match &config.target {
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or_else(|| color_eyre::eyre::eyre!("file path required for file logging"))?;
                Box::new(BufWriter::new(File::create(path)?))
            }
        };

        Ok(Self {
            config,
            writer,
            start_time: Utc::now(),
        })
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let output = match self.config.format {
            LogFormat::Json => self.format_json(&event)?,
            LogFormat::Logfmt => self.format_logfmt(&event),
            LogFormat::Pretty => self.format_pretty(&event),
        };

        writeln!(self.writer, "{}", output)?;
        self.writer.flush()?;

        Ok(())
    }

    fn format_json(&self, event: &LogEvent) -> Result<String> {
        Ok(serde_json::to_string(event)?)
    }

    fn format_logfmt(&self, event: &LogEvent) -> String {
        let ts = Utc::now().to_rfc3339();
        match event {
            LogEvent::Transition(t) => format!(
                "ts=\"{}\" type=transition clock={} from={} to={}",
                ts, t.clock_samples, t.from, t.to
            ),
            LogEvent::Summary(s) => format!(
                "ts=\"{}\" type=summary duration_secs={:.2} blocks={} state={} call_state={} bytes={}",
                ts, s.duration_secs, s.blocks_processed, s.final_state, s.final_call_state, s.bytes_exchanged
            ),
            LogEvent::Info { message } => format!("ts=\"{}\" level=info msg=\"{}\"", ts, message),
            LogEvent::Warn { message } => format!("ts=\"{}\" level=warn msg=\"{}\"", ts, message),
            LogEvent::Error { message, details } => match details {
                Some(d) => format!("ts=\"{}\" level=error msg=\"{}\" details=\"{}\"", ts, message, d),
                None => format!("ts=\"{}\" level=error msg=\"{}\"", ts, message),
            },
        }
    }

    fn format_pretty(&self, event: &LogEvent) -> String {
        let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        match event {
            LogEvent::Transition(t) => {
                format!("[{}] {} -> {} (clock={})", ts, t.from, t.to, t.clock_samples)
            }
            LogEvent::Summary(s) => format!(
                "[{}] SUMMARY ({:.2}s): {} blocks, state={} call_state={} bytes={}",
                ts, s.duration_secs, s.blocks_processed, s.final_state, s.final_call_state, s.bytes_exchanged
            ),
            LogEvent::Info { message } => format!("[{}] INFO: {}", ts, message),
            LogEvent::Warn { message } => format!("[{}] WARN: {}", ts, message),
            LogEvent::Error { message, details } => match details {
                Some(d) => format!("[{}] ERROR: {} | {}", ts, message, d),
                None => format!("[{}] ERROR: {}", ts, message),
            },
        }
    }

    pub fn elapsed(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logfmt_info_contains_message() {
        let config = LoggingConfig {
            target: LogTarget::Stdout,
            file_path: None,
            format: LogFormat::Logfmt,
            level: crate::config::LogLevel::Info,
        };
        let logger = StructuredLogger::new(config).unwrap();
        let line = logger.format_logfmt(&LogEvent::Info {
            message: "dialing 5551234".to_string(),
        });
        assert!(line.contains("msg=\"dialing 5551234\""));
    }

    #[test]
    fn pretty_transition_shows_arrow() {
        let config = LoggingConfig {
            target: LogTarget::Stdout,
            file_path: None,
            format: LogFormat::Pretty,
            level: crate::config::LogLevel::Info,
        };
        let logger = StructuredLogger::new(config).unwrap();
        let line = logger.format_pretty(&LogEvent::Transition(TransitionEvent {
            timestamp: Utc::now(),
            clock_samples: 320,
            from: "Idle".to_string(),
            to: "V8".to_string(),
        }));
        assert!(line.contains("Idle -> V8"));
    }
}
