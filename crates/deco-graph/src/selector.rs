//! Wildcard-aware selectors
//!
//! Provides [`Selector`], the explicit "any value" variant used wherever a
//! name, concept key or property part may be left open.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A value that is either a concrete string or the wildcard
///
/// The wildcard is a dedicated variant so it can never collide with a real
/// resource name or property segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Matches any value
    #[default]
    Any,

    /// Matches exactly this value
    Exact(String),
}

impl Selector {
    /// Create exact selector
    #[inline]
    #[must_use]
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    /// Check if this is the wildcard
    #[inline]
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Exact value, if any
    #[inline]
    #[must_use]
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Exact(value) => Some(value.as_str()),
        }
    }

    /// Check if a concrete value is selected
    #[inline]
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
        }
    }

    /// Check if two selectors can select a common value
    ///
    /// Either side being [`Selector::Any`] is enough.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Exact(a), Self::Exact(b)) => a == b,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}
