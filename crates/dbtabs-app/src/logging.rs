//! Logging setup for the dbtabs shell
//!
//! Two sinks, both driven by `tracing`:
//! - a pretty console layer, for development
//! - daily-rolling JSON files under the data directory, for bug reports
//!
//! `RUST_LOG` overrides the preset's filter.

use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::settings::LogPreset;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// JSON output to rolling files
    pub enable_json_logs: bool,

    /// Pretty output on stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Log span open/close (for timing)
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            enable_spans: cfg!(debug_assertions),
            default_filter: "info,dbtabs_app=debug,dbtabs_core=debug,dbtabs_storage=debug,dbtabs_session=debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Files only; the console stays free for the shell
    pub fn production() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: false,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,dbtabs_app=info,dbtabs_storage=info,dbtabs_session=info".to_string(),
        }
    }

    pub fn development() -> Self {
        Self::default()
    }

    /// Console only, no files
    #[allow(dead_code)]
    pub fn testing() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("dbtabs-tests"),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: "debug".to_string(),
        }
    }

    pub fn for_preset(preset: LogPreset) -> Self {
        match preset {
            LogPreset::Development => Self::development(),
            LogPreset::Production => Self::production(),
        }
    }
}

/// Install the global subscriber.
///
/// Fails if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "dbtabs.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The writer must outlive every span; the process exit flushes it.
        std::mem::forget(guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "logging initialized"
    );

    Ok(())
}

pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dbtabs")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert!(config.enable_console_logs);
        assert!(config.enable_json_logs);
    }

    #[test]
    fn test_production_keeps_console_quiet() {
        let config = LoggingConfig::for_preset(LogPreset::Production);
        assert!(!config.enable_console_logs);
        assert!(config.enable_json_logs);
        assert!(!config.include_location);
    }

    #[test]
    fn test_logs_live_under_dbtabs() {
        assert!(log_directory().ends_with("dbtabs/logs"));
        assert!(!LoggingConfig::testing().enable_json_logs);
    }
}
