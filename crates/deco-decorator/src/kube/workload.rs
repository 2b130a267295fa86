use crate::decorator::{Concept, Decorator, OrderingSpec, VisitContext};
use crate::error::DecorateError;
use crate::kube::{family, non_empty};
use crate::merge::{merge_into, merge_node, MergeStats, Patch};
use deco_config::{join_properties, ConfigReference, Port};
use deco_graph::{resource_path, GraphPath, Node, NodeKind, ResourceRef, Selector};
use tracing::debug;

const DEPLOYMENT: &str = "Deployment";

fn selects_deployment(name: &Selector, resource: &ResourceRef) -> bool {
    resource.kind == DEPLOYMENT && name.matches(&resource.name)
}

/// Adds a container to the pod template of the selected deployments
#[derive(Debug, Clone)]
pub struct AddContainerDecorator {
    deployment: Selector,
    name: String,
    image: Option<String>,
    ports: Vec<Port>,
}

impl AddContainerDecorator {
    /// Create decorator
    #[must_use]
    pub fn new(deployment: impl Into<Selector>, name: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            name: name.into(),
            image: None,
            ports: Vec::new(),
        }
    }

    /// With image
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// With container ports
    #[must_use]
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = Port>) -> Self {
        self.ports.extend(ports);
        self
    }

    fn container(&self) -> Patch {
        let container = Patch::new(NodeKind::Container)
            .owned("name", self.name.as_str())
            .owned_opt("image", self.image.as_deref());

        self.ports.iter().fold(container, |container, port| {
            let (Some(name), Some(number)) = (port.name(), port.container_port) else {
                debug!(container = %self.name, ?port, "skipping container port without name or number");
                return container;
            };
            container.child(
                "ports",
                Patch::new(NodeKind::ContainerPort)
                    .owned("name", name)
                    .owned("containerPort", number)
                    .default_field("protocol", port.protocol.as_deref().unwrap_or("TCP")),
            )
        })
    }
}

impl Decorator for AddContainerDecorator {
    fn id(&self) -> &'static str {
        "AddContainerDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::DeploymentSpec
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        selects_deployment(&self.deployment, resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(Concept::new(family::RESOURCE, DEPLOYMENT))
            .provides(Concept::new(family::CONTAINER, self.name.as_str()))
    }

    fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        let patch = Patch::new(NodeKind::DeploymentSpec).slot(
            "template",
            Patch::new(NodeKind::PodTemplate)
                .slot("spec", Patch::new(NodeKind::PodSpec).child("containers", self.container())),
        );
        merge_node(node, &patch, &mut MergeStats::default())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("AddContainerDecorator({})", self.name)
    }
}

/// Sets the replica count of the selected deployments
#[derive(Debug, Clone)]
pub struct ApplyReplicasDecorator {
    deployment: Selector,
    replicas: u32,
}

impl ApplyReplicasDecorator {
    /// Create decorator
    #[must_use]
    pub fn new(deployment: impl Into<Selector>, replicas: u32) -> Self {
        Self {
            deployment: deployment.into(),
            replicas,
        }
    }
}

impl Decorator for ApplyReplicasDecorator {
    fn id(&self) -> &'static str {
        "ApplyReplicasDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::DeploymentSpec
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        selects_deployment(&self.deployment, resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(Concept::new(family::RESOURCE, DEPLOYMENT))
            .provides(Concept::new(family::REPLICAS, self.deployment.clone()))
    }

    fn config_references(&self) -> Vec<ConfigReference> {
        let path = match self.deployment.as_exact() {
            Some(name) => resource_path(&ResourceRef::new(DEPLOYMENT, name)),
            None => GraphPath::root(),
        };
        vec![ConfigReference::new(
            join_properties(&[self.deployment.clone(), Selector::exact("replicas")]),
            path.child("spec").child("replicas"),
        )
        .with_value(self.replicas)]
    }

    fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        node.set_field("replicas", self.replicas);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ApplyReplicasDecorator({}={})", self.deployment, self.replicas)
    }
}

/// Adds an environment variable to the selected containers
#[derive(Debug, Clone)]
pub struct AddEnvVarDecorator {
    deployment: Selector,
    container: Selector,
    name: String,
    value: String,
}

impl AddEnvVarDecorator {
    /// Create decorator for every container of every deployment
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            deployment: Selector::Any,
            container: Selector::Any,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Restrict to a deployment
    #[must_use]
    pub fn for_deployment(mut self, deployment: impl Into<Selector>) -> Self {
        self.deployment = deployment.into();
        self
    }

    /// Restrict to a container
    #[must_use]
    pub fn for_container(mut self, container: impl Into<Selector>) -> Self {
        self.container = container.into();
        self
    }
}

impl Decorator for AddEnvVarDecorator {
    fn id(&self) -> &'static str {
        "AddEnvVarDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::Container
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        selects_deployment(&self.deployment, resource)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(Concept::new(family::CONTAINER, self.container.clone()))
            .provides(Concept::new(family::ENV, self.name.as_str()))
    }

    fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        let container = non_empty(node.str_field("name")).unwrap_or_default();
        if !self.container.matches(container) {
            return Ok(());
        }
        let env = Patch::new(NodeKind::EnvVar)
            .owned("name", self.name.as_str())
            .owned("value", self.value.as_str());
        merge_into(node, "env", &env, &mut MergeStats::default())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("AddEnvVarDecorator({})", self.name)
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
        graph
    }

    fn containers(graph: &ResourceGraph) -> serde_json::Value {
        graph
            .resolve(&"spec.template.spec.containers".parse().unwrap())
            .unwrap_or_default()
    }

    #[test]
    fn container_with_ports() {
        let mut graph = graph();
        let decorator = AddContainerDecorator::new("web", "web")
            .with_image("web:1.0")
            .with_ports([Port::new("http", 8080), Port::default()]);
        apply(&decorator, &mut graph).unwrap();
        apply(&decorator, &mut graph).unwrap();

        assert_eq!(
            containers(&graph),
            json!([{
                "name": "web",
                "image": "web:1.0",
                "ports": [{"name": "http", "containerPort": 8080, "protocol": "TCP"}]
            }])
        );
    }

    #[test]
    fn second_container_is_appended() {
        let mut graph = graph();
        apply(&AddContainerDecorator::new(Selector::Any, "web"), &mut graph).unwrap();
        apply(&AddContainerDecorator::new(Selector::Any, "proxy"), &mut graph).unwrap();
        assert_eq!(containers(&graph).as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn replicas_set_and_referenced() {
        let mut graph = graph();
        let decorator = ApplyReplicasDecorator::new("web", 3);
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(graph.resolve(&"spec.replicas".parse().unwrap()), Some(json!(3)));

        let references = decorator.config_references();
        assert_eq!(references[0].property(), "web.replicas");
        assert_eq!(
            references[0].paths()[0].to_string(),
            "items(Deployment,web).spec.replicas"
        );
        assert_eq!(references[0].value(), Some(&json!(3)));
    }

    #[test]
    fn wildcard_replicas_reference_uses_relative_path() {
        let references = ApplyReplicasDecorator::new(Selector::Any, 2).config_references();
        assert_eq!(references[0].property(), "replicas");
        assert_eq!(references[0].paths()[0].to_string(), "spec.replicas");
    }

    #[test]
    fn env_var_targets_selected_container() {
        let mut graph = graph();
        apply(&AddContainerDecorator::new("web", "web"), &mut graph).unwrap();
        apply(&AddContainerDecorator::new("web", "proxy"), &mut graph).unwrap();
        let env = AddEnvVarDecorator::new("MODE", "prod").for_container("web");
        apply(&env, &mut graph).unwrap();
        apply(&env, &mut graph).unwrap();

        let containers = containers(&graph);
        assert_eq!(containers[0]["env"], json!([{"name": "MODE", "value": "prod"}]));
        assert!(containers[1].get("env").is_none());
    }

    #[test]
    fn env_var_requires_container() {
        let spec = AddEnvVarDecorator::new("MODE", "prod").for_container("web").ordering();
        let container = AddContainerDecorator::new("web", "web").ordering();
        assert!(container.provides[0].matches(&spec.requires[0]));
    }
}
