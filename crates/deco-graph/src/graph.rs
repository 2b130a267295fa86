//! Resource graph
//!
//! Provides [`ResourceGraph`], the root list of resources a generation pass
//! decorates, and [`ResourceRef`] for naming one resource.

use crate::key::SemanticKey;
use crate::kind::NodeKind;
use crate::node::{GraphError, Node};
use crate::path::{GraphPath, PathSegment};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

const ITEMS: &str = "items";

/// Kind and name of a resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind (`Ingress`, `Deployment`, ...)
    pub kind: String,

    /// `metadata.name`
    pub name: String,
}

impl ResourceRef {
    /// Create reference
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Reference of a resource node
    #[must_use]
    pub fn of(node: &Node) -> Option<Self> {
        if node.kind() != NodeKind::Resource {
            return None;
        }
        let kind = node.str_field("kind")?;
        let name = node.path_field(&["metadata", "name"])?.as_str()?;
        Some(Self::new(kind, name))
    }

    /// Semantic key of the resource in the graph root
    #[inline]
    #[must_use]
    pub fn key(&self) -> SemanticKey {
        SemanticKey::new([self.kind.as_str(), self.name.as_str()])
    }

    /// Check if selected by a kind and a name selector
    #[inline]
    #[must_use]
    pub fn selected_by(&self, kind: &Selector, name: &Selector) -> bool {
        kind.matches(&self.kind) && name.matches(&self.name)
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// In-memory manifest tree of one generation pass
///
/// The root is a [`NodeKind::List`] node whose `items` collection holds the
/// resources, keyed by kind and name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGraph {
    root: Node,
}

impl ResourceGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let mut root = Node::new(NodeKind::List);
        root.set_field("apiVersion", "v1");
        root.set_field("kind", "List");
        Self { root }
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable root node
    #[inline]
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// All resources in document order
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[Node] {
        self.root.children(ITEMS)
    }

    /// Number of resources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources().len()
    }

    /// Check if graph has no resources
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources().is_empty()
    }

    /// Get resource by reference
    #[inline]
    #[must_use]
    pub fn resource(&self, reference: &ResourceRef) -> Option<&Node> {
        self.root.get(ITEMS, &reference.key())
    }

    /// Resources selected by kind and name
    pub fn select<'g>(
        &'g self,
        kind: &'g Selector,
        name: &'g Selector,
    ) -> impl Iterator<Item = &'g Node> + 'g {
        self.resources().iter().filter(move |node| {
            ResourceRef::of(node).is_some_and(|r| r.selected_by(kind, name))
        })
    }

    /// Add a resource skeleton unless one with the same kind and name exists
    ///
    /// Returns `true` if the resource was created.
    ///
    /// # Errors
    /// Returns error if the skeleton cannot be attached
    pub fn ensure_resource(&mut self, api_version: &str, kind: &str, name: &str) -> Result<bool, GraphError> {
        let reference = ResourceRef::new(kind, name);
        if self.root.has(ITEMS, &reference.key()) {
            return Ok(false);
        }
        self.root.push(ITEMS, Node::resource(api_version, kind, name))?;
        Ok(true)
    }

    /// Add a fully built resource
    ///
    /// # Errors
    /// Returns error if a resource with the same kind and name exists
    pub fn add_resource(&mut self, resource: Node) -> Result<(), GraphError> {
        self.root.push(ITEMS, resource)
    }

    /// Resolve a path
    ///
    /// A path starting at `items` is resolved from the root; any other path
    /// is tried against each resource in document order and the first hit
    /// wins.
    #[must_use]
    pub fn resolve(&self, path: &GraphPath) -> Option<Value> {
        let from_root = path.first().is_some_and(|seg| seg.name() == ITEMS);
        if from_root || path.is_empty() {
            return path.resolve(&self.root);
        }
        self.resources().iter().find_map(|res| path.resolve(res))
    }

    /// Manifest value of the whole graph
    #[inline]
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(&self.to_value())
            .map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, GraphError> {
        serde_yaml::to_string(&self.to_value())
            .map_err(|e| GraphError::Serialization(e.to_string()))
    }
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Path selecting a resource from the graph root
#[must_use]
pub fn resource_path(reference: &ResourceRef) -> GraphPath {
    GraphPath::new(vec![PathSegment::Keyed(ITEMS.to_string(), reference.key())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.ensure_resource("apps/v1", "Deployment", "web").unwrap();
        graph.ensure_resource("v1", "Service", "web").unwrap();
        graph
    }

    #[test]
    fn ensure_resource_is_idempotent() {
        let mut graph = graph();
        assert!(!graph.ensure_resource("apps/v1", "Deployment", "web").unwrap());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn add_resource_rejects_duplicate() {
        let mut graph = graph();
        let err = graph
            .add_resource(Node::resource("v1", "Service", "web"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateKey { .. }));
    }

    #[test]
    fn lookup_by_reference() {
        let graph = graph();
        let svc = graph.resource(&ResourceRef::new("Service", "web")).unwrap();
        assert_eq!(svc.slot("spec").unwrap().kind(), NodeKind::ServiceSpec);
        assert!(graph.resource(&ResourceRef::new("Service", "api")).is_none());
    }

    #[test]
    fn select_with_wildcards() {
        let graph = graph();
        assert_eq!(graph.select(&Selector::Any, &Selector::exact("web")).count(), 2);
        assert_eq!(
            graph
                .select(&Selector::exact("Service"), &Selector::Any)
                .count(),
            1
        );
    }

    #[test]
    fn resolve_relative_path_hits_first_resource() {
        let mut graph = graph();
        let deployment = ResourceRef::new("Deployment", "web").key();
        graph
            .root_mut()
            .edit("items", &deployment)
            .unwrap()
            .ensure_slot("spec")
            .unwrap()
            .set_field("replicas", 2);

        let path: GraphPath = "spec.replicas".parse().unwrap();
        assert_eq!(graph.resolve(&path), Some(json!(2)));
    }

    #[test]
    fn resolve_from_root() {
        let graph = graph();
        let path = resource_path(&ResourceRef::new("Service", "web")).child("kind");
        assert_eq!(graph.resolve(&path), Some(json!("Service")));
    }

    #[test]
    fn json_export_is_stable() {
        let a = graph().to_json().unwrap();
        let b = graph().to_json().unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"items\""));
    }

    #[test]
    fn yaml_export() {
        let yaml = graph().to_yaml().unwrap();
        assert!(yaml.contains("kind: List"));
        assert!(yaml.contains("name: web"));
    }
}
