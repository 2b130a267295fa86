use crate::decorator::{Concept, Decorator, OrderingSpec, VisitContext};
use crate::error::DecorateError;
use crate::kube::family;
use crate::merge::{merge_node, MergeStats, Patch};
use deco_graph::{Node, NodeKind, ResourceRef, Selector};

const LABELS: &str = "labels";
const ANNOTATIONS: &str = "annotations";

/// Depth of `items(Kind,name).metadata`
const RESOURCE_METADATA_DEPTH: usize = 2;

/// Which resources a metadata decorator applies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Scope {
    kind: Selector,
    name: Selector,
}

impl Scope {
    fn selects(&self, resource: &ResourceRef) -> bool {
        resource.selected_by(&self.kind, &self.name)
    }

    fn requires(&self) -> Concept {
        Concept::new(family::RESOURCE, self.kind.clone())
    }
}

fn put_entry(node: &mut Node, context: &VisitContext, map: &str, key: &str, value: &str) -> Result<(), DecorateError> {
    if context.depth() != RESOURCE_METADATA_DEPTH {
        return Ok(());
    }
    let patch = Patch::new(NodeKind::Metadata).slot(map, Patch::new(NodeKind::Map).owned(key, value));
    merge_node(node, &patch, &mut MergeStats::default())?;
    Ok(())
}

/// Adds a label to the metadata of the selected resources
#[derive(Debug, Clone)]
pub struct AddLabelDecorator {
    scope: Scope,
    key: String,
    value: String,
}

impl AddLabelDecorator {
    /// Label every resource
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scope: Scope::default(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Restrict to resources of a kind
    #[must_use]
    pub fn for_kind(mut self, kind: impl Into<Selector>) -> Self {
        self.scope.kind = kind.into();
        self
    }

    /// Restrict to resources with a name
    #[must_use]
    pub fn for_name(mut self, name: impl Into<Selector>) -> Self {
        self.scope.name = name.into();
        self
    }
}

impl Decorator for AddLabelDecorator {
    fn id(&self) -> &'static str {
        "AddLabelDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::Metadata
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        self.scope.selects(resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(self.scope.requires())
            .provides(Concept::new(family::LABEL, self.key.as_str()))
    }

    fn visit(&self, node: &mut Node, context: &VisitContext) -> Result<(), DecorateError> {
        put_entry(node, context, LABELS, &self.key, &self.value)
    }

    fn describe(&self) -> String {
        format!("AddLabelDecorator({}={})", self.key, self.value)
    }
}

/// Removes a label, or every label for a wildcard key
#[derive(Debug, Clone)]
pub struct RemoveLabelDecorator {
    scope: Scope,
    key: Selector,
}

impl RemoveLabelDecorator {
    /// Remove from every resource
    #[must_use]
    pub fn new(key: impl Into<Selector>) -> Self {
        Self {
            scope: Scope::default(),
            key: key.into(),
        }
    }

    /// Restrict to resources of a kind
    #[must_use]
    pub fn for_kind(mut self, kind: impl Into<Selector>) -> Self {
        self.scope.kind = kind.into();
        self
    }

    /// Restrict to resources with a name
    #[must_use]
    pub fn for_name(mut self, name: impl Into<Selector>) -> Self {
        self.scope.name = name.into();
        self
    }
}

impl Decorator for RemoveLabelDecorator {
    fn id(&self) -> &'static str {
        "RemoveLabelDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::Metadata
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        self.scope.selects(resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(self.scope.requires())
            .removes(Concept::new(family::LABEL, self.key.clone()))
    }

    fn visit(&self, node: &mut Node, context: &VisitContext) -> Result<(), DecorateError> {
        if context.depth() != RESOURCE_METADATA_DEPTH {
            return Ok(());
        }
        match &self.key {
            Selector::Any => {
                node.remove_slot(LABELS);
            }
            Selector::Exact(key) => {
                if let Some(labels) = node.slot_mut(LABELS) {
                    labels.remove_field(key);
                }
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("RemoveLabelDecorator({})", self.key)
    }
}

/// Adds an annotation to the metadata of the selected resources
#[derive(Debug, Clone)]
pub struct AddAnnotationDecorator {
    scope: Scope,
    key: String,
    value: String,
}

impl AddAnnotationDecorator {
    /// Annotate every resource
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scope: Scope::default(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Restrict to resources of a kind
    #[must_use]
    pub fn for_kind(mut self, kind: impl Into<Selector>) -> Self {
        self.scope.kind = kind.into();
        self
    }
}

impl Decorator for AddAnnotationDecorator {
    fn id(&self) -> &'static str {
        "AddAnnotationDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::Metadata
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        self.scope.selects(resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(self.scope.requires())
            .provides(Concept::new(family::ANNOTATION, self.key.as_str()))
    }

    fn visit(&self, node: &mut Node, context: &VisitContext) -> Result<(), DecorateError> {
        put_entry(node, context, ANNOTATIONS, &self.key, &self.value)
    }

    fn describe(&self) -> String {
        format!("AddAnnotationDecorator({})", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::apply;
    use deco_graph::ResourceGraph;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.ensure_resource("apps/v1", "Deployment", "web").unwrap();
        graph.ensure_resource("v1", "Service", "web").unwrap();
        graph
    }

    fn labels(graph: &ResourceGraph, kind: &str) -> Option<serde_json::Value> {
        graph
            .resource(&ResourceRef::new(kind, "web"))
            .and_then(|r| r.path_field(&["metadata", "labels", "app"]).cloned())
    }

    #[test]
    fn label_scoped_by_kind() {
        let mut graph = graph();
        apply(&AddLabelDecorator::new("app", "web").for_kind("Service"), &mut graph).unwrap();
        assert_eq!(labels(&graph, "Service"), Some(json!("web")));
        assert_eq!(labels(&graph, "Deployment"), None);
    }

    #[test]
    fn label_is_idempotent() {
        let mut graph = graph();
        let decorator = AddLabelDecorator::new("app", "web");
        apply(&decorator, &mut graph).unwrap();
        let once = graph.clone();
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(graph, once);
    }

    #[test]
    fn remove_exact_label() {
        let mut graph = graph();
        apply(&AddLabelDecorator::new("app", "web"), &mut graph).unwrap();
        apply(&AddLabelDecorator::new("tier", "front"), &mut graph).unwrap();
        apply(&RemoveLabelDecorator::new("app"), &mut graph).unwrap();

        let service = graph.resource(&ResourceRef::new("Service", "web")).unwrap();
        assert_eq!(
            service.slot("metadata").unwrap().to_value(),
            json!({"name": "web", "labels": {"tier": "front"}})
        );
    }

    #[test]
    fn remove_all_labels() {
        let mut graph = graph();
        apply(&AddLabelDecorator::new("app", "web"), &mut graph).unwrap();
        apply(&RemoveLabelDecorator::new(Selector::Any).for_name("web"), &mut graph).unwrap();
        assert_eq!(labels(&graph, "Service"), None);
        assert_eq!(labels(&graph, "Deployment"), None);
    }

    #[test]
    fn adder_orders_before_wildcard_remover() {
        let add = AddLabelDecorator::new("app", "web").ordering();
        let remove = RemoveLabelDecorator::new(Selector::Any).ordering();
        assert!(add.provides[0].matches(&remove.removes[0]));
    }

    #[test]
    fn annotation_added() {
        let mut graph = graph();
        apply(&AddAnnotationDecorator::new("owner", "team-a").for_kind("Deployment"), &mut graph).unwrap();
        let deployment = graph.resource(&ResourceRef::new("Deployment", "web")).unwrap();
        assert_eq!(
            deployment.path_field(&["metadata", "annotations", "owner"]),
            Some(&json!("team-a"))
        );
    }
}
