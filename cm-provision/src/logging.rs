//! Logging configuration module
//! Structured logging to the console with an optional rolling file

use serde::{Deserialize, Serialize};
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "cm-provision.log";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,             // log level (trace, debug, info, warn, error)
    pub file_path: Option<String>, // log directory
    pub rotation: LogRotation,     // log rotation policy
    pub json_format: bool,         // use JSON formatting on the console
}

/// Log rotation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            rotation: LogRotation::Daily,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Initialize logging based on configuration.
    ///
    /// The returned guard flushes the file writer and must be held for the
    /// lifetime of the program.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        // Logs go to stderr so command output on stdout stays machine readable
        let console_layer = if self.json_format {
            fmt::layer()
                .with_target(true)
                .json()
                .with_writer(io::stderr)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stderr)
                .boxed()
        };

        let (file_layer, guard) = match self.file_path {
            Some(ref path) => {
                let file_appender = match self.rotation {
                    LogRotation::Hourly => rolling::hourly(path, LOG_FILE_NAME),
                    LogRotation::Daily => rolling::daily(path, LOG_FILE_NAME),
                    LogRotation::Never => rolling::never(path, LOG_FILE_NAME),
                };
                let (writer, guard) = non_blocking(file_appender);

                let layer = fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false)
                    .json()
                    .with_writer(writer)
                    .boxed();
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!("Logging initialized - level: {}", self.level);

        Ok(guard)
    }
}
