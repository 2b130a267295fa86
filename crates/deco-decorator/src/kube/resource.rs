use crate::decorator::{Concept, Decorator, OrderingSpec, VisitContext};
use crate::error::DecorateError;
use crate::kube::family;
use crate::merge::{merge_into, MergeStats, Patch};
use deco_graph::{Node, NodeKind};
use serde_json::Value;

/// Adds a resource skeleton to the graph
///
/// An existing resource of the same kind and name is merged into, never
/// duplicated. Spec fields are defaults: values already present win.
#[derive(Debug, Clone)]
pub struct AddResourceDecorator {
    api_version: String,
    kind: String,
    name: String,
    spec: Vec<(String, Value)>,
}

impl AddResourceDecorator {
    /// Create decorator
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            spec: Vec::new(),
        }
    }

    /// `apps/v1` Deployment
    #[must_use]
    pub fn deployment(name: impl Into<String>) -> Self {
        Self::new("apps/v1", "Deployment", name)
    }

    /// `v1` Service
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self::new("v1", "Service", name)
    }

    /// `networking.k8s.io/v1` Ingress
    #[must_use]
    pub fn ingress(name: impl Into<String>) -> Self {
        Self::new("networking.k8s.io/v1", "Ingress", name)
    }

    /// With a default spec field
    #[must_use]
    pub fn with_spec_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.push((name.into(), value.into()));
        self
    }
}

impl Decorator for AddResourceDecorator {
    fn id(&self) -> &'static str {
        "AddResourceDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::List
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new().provides(Concept::new(family::RESOURCE, self.kind.as_str()))
    }

    fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        let spec = self
            .spec
            .iter()
            .fold(Patch::new(NodeKind::spec_kind_for(&self.kind)), |patch, (name, value)| {
                patch.default_field(name.as_str(), value.clone())
            });
        let resource = Patch::new(NodeKind::Resource)
            .owned("apiVersion", self.api_version.as_str())
            .owned("kind", self.kind.as_str())
            .slot("metadata", Patch::new(NodeKind::Metadata).owned("name", self.name.as_str()))
            .slot("spec", spec);
        merge_into(node, "items", &resource, &mut MergeStats::default())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("AddResourceDecorator({}/{})", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::apply;
    use deco_graph::{ResourceGraph, ResourceRef};
    use serde_json::json;

    #[test]
    fn adds_resource_once() {
        let mut graph = ResourceGraph::new();
        let decorator = AddResourceDecorator::ingress("web").with_spec_field("ingressClassName", "nginx");
        apply(&decorator, &mut graph).unwrap();
        apply(&decorator, &mut graph).unwrap();

        assert_eq!(graph.len(), 1);
        let ingress = graph.resource(&ResourceRef::new("Ingress", "web")).unwrap();
        assert_eq!(ingress.slot("spec").unwrap().kind(), NodeKind::IngressSpec);
        assert_eq!(
            ingress.slot("spec").unwrap().field("ingressClassName"),
            Some(&json!("nginx"))
        );
    }

    #[test]
    fn existing_spec_fields_win() {
        let mut graph = ResourceGraph::new();
        apply(&AddResourceDecorator::ingress("web").with_spec_field("ingressClassName", "traefik"), &mut graph)
            .unwrap();
        apply(&AddResourceDecorator::ingress("web").with_spec_field("ingressClassName", "nginx"), &mut graph)
            .unwrap();
        let value = graph.resolve(&"spec.ingressClassName".parse().unwrap());
        assert_eq!(value, Some(json!("traefik")));
    }

    #[test]
    fn provides_resource_kind() {
        let spec = AddResourceDecorator::service("web").ordering();
        assert!(spec.provides[0].matches(&Concept::new(family::RESOURCE, "Service")));
        assert!(!spec.provides[0].matches(&Concept::new(family::RESOURCE, "Ingress")));
    }
}
