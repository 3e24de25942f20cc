//! Tracing subscriber setup.

use std::{io, sync::Once};

use clap::ValueEnum;
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, fmt::time::SystemTime, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Stdout log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Timestamp, level, target, and fields.
    #[default]
    Full,
    /// Level and fields only.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Configuration for stdout logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdoutLogConfig {
    /// Output format.
    pub format: LogFormat,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default level, overridable through `RUST_LOG`.
    pub global_level: LevelFilter,
    /// Stdout logging, `None` when quiet.
    pub stdout_logs: Option<StdoutLogConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global_level: LevelFilter::INFO,
            stdout_logs: Some(StdoutLogConfig { format: LogFormat::Full }),
        }
    }
}

impl LogConfig {
    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init_tracing_subscriber(&self) -> eyre::Result<()> {
        let filter =
            EnvFilter::builder().with_default_directive(self.global_level.into()).from_env_lossy();

        tracing_subscriber::registry()
            .with(filter)
            .with(self.stdout_logs.as_ref().map(build_stdout_layer))
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))
    }
}

/// Maps `-v` counts to levels: 1=ERROR, 2=WARN, 3=INFO, 4=DEBUG, 5+=TRACE, 0=OFF.
pub const fn verbosity_to_level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn build_stdout_layer<S>(config: &StdoutLogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
{
    let base = tracing_subscriber::fmt::layer().with_writer(io::stdout).with_timer(SystemTime);

    match config.format {
        LogFormat::Full => Box::new(base),
        LogFormat::Compact => Box::new(base.compact()),
        LogFormat::Json => Box::new(base.json()),
    }
}

/// Initializes tracing for tests once, writing through the test harness.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter =
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();

        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::off(0, LevelFilter::OFF)]
    #[case::error(1, LevelFilter::ERROR)]
    #[case::warn(2, LevelFilter::WARN)]
    #[case::info(3, LevelFilter::INFO)]
    #[case::debug(4, LevelFilter::DEBUG)]
    #[case::trace(5, LevelFilter::TRACE)]
    #[case::saturates(9, LevelFilter::TRACE)]
    fn test_verbosity_to_level_filter(#[case] level: u8, #[case] expected: LevelFilter) {
        assert_eq!(verbosity_to_level_filter(level), expected);
    }

    #[test]
    fn test_init_test_tracing_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
