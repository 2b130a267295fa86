//! Error types for Deco Core
//!
//! Every crate of the workspace reports its own error enum; a generation
//! pass wraps them in [`GenerationError`]:
//! - Configuration registration and resolution failures
//! - Cyclic decorator constraints
//! - Decorators that cannot be applied
//! - Output serialization

use deco_config::ConfigError;
use deco_decorator::{DecorateError, OrderingError};
use deco_graph::{GraphError, PathError};

/// Main generation error type
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Configuration could not be registered or resolved
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Decorator constraints are cyclic
    #[error("ordering failed: {0}")]
    Ordering(#[from] OrderingError),

    /// A decorator could not be applied
    #[error("decoration failed: {0}")]
    Decorate(#[from] DecorateError),

    /// Graph structure violated
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Config reference path did not parse
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Re-applying the decorators changed the output
    #[error("decorators are not idempotent: a second pass changed {changed}")]
    NotIdempotent { changed: String },

    /// Session settings could not be loaded
    #[error("invalid session settings: {0}")]
    Settings(String),
}

impl GenerationError {
    /// Check if error is retryable
    ///
    /// Generation is a pure function of its inputs; running it again with
    /// the same inputs fails the same way.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Property the user should set to fix the error, if known
    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::Decorate(error) => error.remediation(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_retryable() {
        let missing = GenerationError::from(DecorateError::missing("kubernetes.name", "The application name was not set"));
        assert!(!missing.is_retryable());
        assert!(!GenerationError::Settings("bad".into()).is_retryable());
    }

    #[test]
    fn remediation_passes_through() {
        let missing = GenerationError::from(DecorateError::missing("kubernetes.ports.name", "The port name was not set"));
        assert_eq!(missing.remediation(), Some("kubernetes.ports.name"));
        assert!(missing.to_string().contains("Specify it using `kubernetes.ports.name`"));
        assert_eq!(GenerationError::Settings("bad".into()).remediation(), None);
    }
}
