//! Config references
//!
//! A [`ConfigReference`] names a configuration property and where its value
//! lands in the generated graph, so downstream tooling can parameterize the
//! output.

use deco_graph::{GraphPath, PathError, ResourceGraph, Selector};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// Named configuration property and its graph locations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigReference {
    property: String,
    #[serde(serialize_with = "serialize_paths")]
    paths: Vec<GraphPath>,
    value: Option<Value>,
    expression: Option<String>,
    profile: Option<String>,
}

fn serialize_paths<S: serde::Serializer>(paths: &[GraphPath], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(ToString::to_string))
}

impl ConfigReference {
    /// Reference with one path
    #[inline]
    #[must_use]
    pub fn new(property: impl Into<String>, path: GraphPath) -> Self {
        Self::with_paths(property, vec![path])
    }

    /// Reference with several paths
    #[must_use]
    pub fn with_paths(property: impl Into<String>, paths: Vec<GraphPath>) -> Self {
        Self {
            property: property.into(),
            paths,
            value: None,
            expression: None,
            profile: None,
        }
    }

    /// Reference with one path in text form
    ///
    /// # Errors
    /// Returns error if the path does not parse
    pub fn parse(property: impl Into<String>, path: &str) -> Result<Self, PathError> {
        Ok(Self::new(property, path.parse()?))
    }

    /// With explicit value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// With template expression
    #[inline]
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// With profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Property name
    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Graph paths
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &[GraphPath] {
        &self.paths
    }

    /// Explicit value
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Template expression
    #[inline]
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Profile
    #[inline]
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }
}

/// Join property parts, skipping wildcards and empty parts
///
/// `["image", ANY, "", "name"]` joins to `image.name`; stray dots inside a
/// part never produce empty segments.
#[must_use]
pub fn join_properties(parts: &[Selector]) -> String {
    parts
        .iter()
        .filter_map(Selector::as_exact)
        .flat_map(|part| part.split('.'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    /// Literal value
    Value(Value),
    /// Opaque template expression
    Expression(String),
    /// Nothing found
    Absent,
}

impl ResolvedValue {
    /// Check if nothing was found
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Resolved reference with its property and profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedReference {
    /// Property name
    pub property: String,
    /// Resolution outcome
    pub value: ResolvedValue,
    /// Profile of the reference
    pub profile: Option<String>,
}

/// Resolves config references against a decorated graph
///
/// Precedence: explicit value, then expression, then the first path that
/// resolves in the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigReferenceResolver;

impl ConfigReferenceResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve one reference
    #[must_use]
    pub fn resolve(&self, reference: &ConfigReference, graph: &ResourceGraph) -> ResolvedValue {
        if let Some(value) = &reference.value {
            return ResolvedValue::Value(value.clone());
        }
        if let Some(expression) = &reference.expression {
            return ResolvedValue::Expression(expression.clone());
        }
        let found = reference.paths.iter().find_map(|path| graph.resolve(path));
        trace!(property = %reference.property, found = found.is_some(), "resolved config reference");
        found.map_or(ResolvedValue::Absent, ResolvedValue::Value)
    }

    /// Resolve all references in order
    #[must_use]
    pub fn resolve_all(&self, references: &[ConfigReference], graph: &ResourceGraph) -> Vec<ResolvedReference> {
        references
            .iter()
            .map(|reference| ResolvedReference {
                property: reference.property.clone(),
                value: self.resolve(reference, graph),
                profile: reference.profile.clone(),
            })
            .collect()
    }
}
