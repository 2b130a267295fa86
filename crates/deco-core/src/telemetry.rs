//! Tracing initialization
//!
//! Installs a `tracing-subscriber` registry filtered by `RUST_LOG`
//! (default `info`), printing human readable or JSON lines.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Errors that can occur during tracing initialization
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// With JSON output
    #[inline]
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// With default filter directives
    #[inline]
    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber with default settings
///
/// # Errors
/// Returns [`TelemetryError::SubscriberInit`] if a subscriber is already set
pub fn init_tracing() -> Result<(), TelemetryError> {
    init_tracing_with(&TelemetryConfig::default())
}

/// Install the global subscriber
///
/// # Errors
/// Returns [`TelemetryError::SubscriberInit`] if a subscriber is already set
pub fn init_tracing_with(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Option<Layer> is a Layer, so only one of these is active
    let (json, text) = if config.json {
        (Some(tracing_subscriber::fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_target(true)))
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
