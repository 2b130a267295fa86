//! Decoration errors with diagnostics

use deco_graph::GraphError;
use std::fmt::{self, Display, Formatter};

/// Why one decorator must run before another
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintReason {
    /// Earlier removes what later requires
    RemovesRequired(String),
    /// Earlier provides what later requires
    ProvidesRequired(String),
    /// Earlier provides what later removes
    ProvidesRemoved(String),
    /// Explicit `after`/`before` declaration
    Explicit,
}

impl Display for ConstraintReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemovesRequired(c) => write!(f, "removes required {c}"),
            Self::ProvidesRequired(c) => write!(f, "provides required {c}"),
            Self::ProvidesRemoved(c) => write!(f, "provides removed {c}"),
            Self::Explicit => f.write_str("explicit ordering"),
        }
    }
}

/// Ordering edge taking part in a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    /// Decorator that must run first
    pub before: String,
    /// Decorator that must run later
    pub after: String,
    /// Why
    pub reason: ConstraintReason,
}

impl Display for CycleEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.before, self.after, self.reason)
    }
}

/// Errors while ordering decorators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    /// Constraints form a cycle; nothing was applied
    #[error("cyclic decorator constraints between [{}]: {}", .participants.join(", "), display_edges(.edges))]
    Cycle {
        /// Decorators in the cycle
        participants: Vec<String>,
        /// Constraints among them
        edges: Vec<CycleEdge>,
    },
}

fn display_edges(edges: &[CycleEdge]) -> String {
    edges.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Errors while applying decorators
#[derive(Debug, thiserror::Error)]
pub enum DecorateError {
    /// A value needed to build the manifest is missing
    #[error("{message}. Specify it using `{property}`")]
    MissingReference {
        /// Property to set
        property: String,
        /// What is missing
        message: String,
    },

    /// A decorator needing one target selects several
    #[error("{decorator} matches {} resources ({}). Narrow it using `{property}`", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        /// Decorator description
        decorator: String,
        /// Selected candidates
        candidates: Vec<String>,
        /// Property to set
        property: String,
    },

    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Ordering failed
    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

impl DecorateError {
    /// Create missing reference error
    #[inline]
    #[must_use]
    pub fn missing(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingReference {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Property the user should set to fix the error
    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::MissingReference { property, .. } | Self::Ambiguous { property, .. } => Some(property),
            Self::Graph(_) | Self::Ordering(_) => None,
        }
    }
}
