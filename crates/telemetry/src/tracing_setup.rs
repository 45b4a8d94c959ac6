//! Structured logging for pipeline runs.
//!
//! Settings come from the `[logging]` config section; `RUST_LOG` overrides
//! the configured filter when set.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Default filter: pipeline crates at debug, everything else at info.
pub const DEFAULT_FILTER: &str = "info,sales_pipeline=debug,worker=debug";

/// Output layout for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Compact,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Log task span open/close, which carries the run id and durations.
    #[serde(default)]
    pub span_events: bool,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
            span_events: false,
        }
    }
}

impl LoggingConfig {
    /// The filter in effect: `RUST_LOG` if set and non-empty, else the
    /// configured one.
    pub fn effective_filter(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.filter.clone())
    }
}

/// Installs the global subscriber. Returns false when one was already
/// installed, which leaves the first in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = config.effective_filter();
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_span_events(span_events)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_span_events(span_events).with_target(true))
            .try_init(),
    };

    let installed = result.is_ok();
    if installed {
        tracing::info!(filter = %filter, format = ?config.format, "Logging initialized");
    }
    installed
}
