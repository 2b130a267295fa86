//! Deco Decorators
//!
//! Ordering, dispatch and merge-by-key resolution of manifest decorators.
//!
//! # Core Concepts
//!
//! - [`Decorator`]: Unit of mutation targeting one node kind
//! - [`OrderingSpec`]: Concepts a decorator provides, removes and requires
//! - [`DecoratorRegistry`]: Orders decorators and applies them to a graph
//! - [`Patch`]: Desired sub-tree, merged into the graph by semantic key
//!
//! # Ordering
//!
//! The order is a topological sort of the constraints derived from every
//! decorator's [`OrderingSpec`]; ties keep registration order. A cycle is
//! reported with every participant before any decorator runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use deco_decorator::{kube::*, DecoratorRegistry};
//!
//! let mut registry = DecoratorRegistry::new();
//! registry.register(AddIngressRuleDecorator::new("web", Some(port), rule));
//! registry.register(AddResourceDecorator::ingress("web"));
//! registry.apply(&mut graph)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod decorator;
mod error;
mod merge;
mod ordering;
mod registry;
mod visitor;

// Built-in decorators
pub mod kube;

// Re-exports
pub use decorator::{Concept, Decorator, OrderingSpec, VisitContext};
pub use error::{ConstraintReason, CycleEdge, DecorateError, OrderingError};
pub use merge::{merge_into, merge_node, FieldMode, MergeStats, Patch, SlotMode};
pub use ordering::{order, DependencyGraph};
pub use registry::DecoratorRegistry;
pub use visitor::{apply, ApplyReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
