//! Decorator trait and ordering declarations
//!
//! Provides the [`Decorator`] trait, the [`Concept`]s a decorator touches and
//! the [`OrderingSpec`] it declares.

use crate::error::DecorateError;
use deco_config::ConfigReference;
use deco_graph::{GraphPath, Node, NodeKind, PathSegment, ResourceRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Unit of manifest mutation
///
/// A decorator names the node kind it targets and mutates each matching node
/// through the keyed graph API. Applying a decorator twice must leave the
/// graph as applying it once does.
pub trait Decorator: Send + Sync + std::fmt::Debug {
    /// Stable identity of the decorator class, used by `after`/`before`
    fn id(&self) -> &'static str;

    /// Node kind this decorator mutates
    fn target(&self) -> NodeKind;

    /// Check if the decorator applies within a resource
    ///
    /// Not consulted for decorators targeting the graph root.
    fn selects(&self, _resource: &ResourceRef) -> bool {
        true
    }

    /// Property to point at when more than one resource is selected
    ///
    /// `Some` makes the decorator require a unique target resource.
    fn unique_target_property(&self) -> Option<&'static str> {
        None
    }

    /// Ordering declarations
    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::default()
    }

    /// Config references contributed by this decorator
    fn config_references(&self) -> Vec<ConfigReference> {
        Vec::new()
    }

    /// Mutate one matching node
    ///
    /// # Errors
    /// Returns error if the decorator cannot be applied; the pass aborts
    fn visit(&self, node: &mut Node, context: &VisitContext) -> Result<(), DecorateError>;

    /// Human readable description for diagnostics
    fn describe(&self) -> String {
        self.id().to_string()
    }
}

/// Where a visited node sits in the graph
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    resource: Option<ResourceRef>,
    segments: Vec<PathSegment>,
}

impl VisitContext {
    /// Context at the graph root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Context inside a resource
    #[inline]
    #[must_use]
    pub fn within(resource: ResourceRef) -> Self {
        Self {
            resource: Some(resource),
            segments: Vec::new(),
        }
    }

    /// Enclosing resource, if any
    #[inline]
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    /// Name of the enclosing resource
    #[inline]
    #[must_use]
    pub fn resource_name(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.name.as_str())
    }

    /// Number of path segments from the graph root
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Path of the visited node from the graph root
    #[must_use]
    pub fn path(&self) -> GraphPath {
        GraphPath::new(self.segments.clone())
    }

    pub(crate) fn set_resource(&mut self, resource: Option<ResourceRef>) {
        self.resource = resource;
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }
}

/// Semantic concept a decorator provides, removes or requires
///
/// Concepts of the same family match when their keys overlap; a wildcard
/// key matches every key of the family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept {
    family: String,
    key: Selector,
}

impl Concept {
    /// Create concept
    #[inline]
    #[must_use]
    pub fn new(family: impl Into<String>, key: impl Into<Selector>) -> Self {
        Self {
            family: family.into(),
            key: key.into(),
        }
    }

    /// Concept covering every key of a family
    #[inline]
    #[must_use]
    pub fn any(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            key: Selector::Any,
        }
    }

    /// Family name
    #[inline]
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Key selector
    #[inline]
    #[must_use]
    pub fn key(&self) -> &Selector {
        &self.key
    }

    /// Check if two concepts denote overlapping parts of the graph
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.family == other.family && self.key.overlaps(&other.key)
    }
}

impl Display for Concept {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.key)
    }
}

/// Ordering declarations of a decorator
///
/// # Derived constraints
/// For decorators `a` and `b`, `a` runs before `b` when
/// - `a` removes a concept `b` requires
/// - `a` provides a concept `b` requires
/// - `a` provides a concept `b` removes
/// - `b` lists `a` in `after`, or `a` lists `b` in `before`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingSpec {
    /// Concepts created
    pub provides: Vec<Concept>,
    /// Concepts deleted
    pub removes: Vec<Concept>,
    /// Concepts that must be settled first
    pub requires: Vec<Concept>,
    /// Decorator identities that must run first
    pub after: Vec<&'static str>,
    /// Decorator identities that must run later
    pub before: Vec<&'static str>,
}

impl OrderingSpec {
    /// Create empty spec
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a provided concept
    #[inline]
    #[must_use]
    pub fn provides(mut self, concept: Concept) -> Self {
        self.provides.push(concept);
        self
    }

    /// Declare a removed concept
    #[inline]
    #[must_use]
    pub fn removes(mut self, concept: Concept) -> Self {
        self.removes.push(concept);
        self
    }

    /// Declare a required concept
    #[inline]
    #[must_use]
    pub fn requires(mut self, concept: Concept) -> Self {
        self.requires.push(concept);
        self
    }

    /// Run after decorators with this identity
    #[inline]
    #[must_use]
    pub fn after(mut self, id: &'static str) -> Self {
        self.after.push(id);
        self
    }

    /// Run before decorators with this identity
    #[inline]
    #[must_use]
    pub fn before(mut self, id: &'static str) -> Self {
        self.before.push(id);
        self
    }

    /// Check if nothing is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provides.is_empty()
            && self.removes.is_empty()
            && self.requires.is_empty()
            && self.after.is_empty()
            && self.before.is_empty()
    }
}
