use crate::decorator::{Concept, Decorator, OrderingSpec, VisitContext};
use crate::error::DecorateError;
use crate::kube::family;
use crate::merge::{merge_into, MergeStats, Patch};
use deco_config::Port;
use deco_graph::{Node, NodeKind, ResourceRef, Selector};

const SERVICE: &str = "Service";

/// Exposes a port on the selected services
///
/// The service port defaults to the container port; `targetPort` and
/// `protocol` are only filled when unset.
#[derive(Debug, Clone)]
pub struct AddServicePortDecorator {
    service: Selector,
    port: Port,
}

impl AddServicePortDecorator {
    /// Create decorator
    #[must_use]
    pub fn new(service: impl Into<Selector>, port: Port) -> Self {
        Self {
            service: service.into(),
            port,
        }
    }
}

impl Decorator for AddServicePortDecorator {
    fn id(&self) -> &'static str {
        "AddServicePortDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::ServiceSpec
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        resource.kind == SERVICE && self.service.matches(&resource.name)
    }

    fn ordering(&self) -> OrderingSpec {
        let port = self.port.name().map_or(Selector::Any, Selector::exact);
        OrderingSpec::new()
            .requires(Concept::new(family::RESOURCE, SERVICE))
            .provides(Concept::new(family::SERVICE_PORT, port))
    }

    fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        let name = self
            .port
            .name()
            .ok_or_else(|| DecorateError::missing("kubernetes.ports.name", "Service ports need a name"))?;
        let number = self
            .port
            .service_port
            .or(self.port.container_port)
            .ok_or_else(|| {
                DecorateError::missing(
                    "kubernetes.ports.container-port",
                    format!("No port number for service port '{name}'"),
                )
            })?;

        let mut port = Patch::new(NodeKind::ServicePort)
            .owned("name", name)
            .owned("port", number);
        if let Some(target) = self.port.container_port {
            port = port.default_field("targetPort", target);
        }
        port = port.default_field("protocol", self.port.protocol.as_deref().unwrap_or("TCP"));

        merge_into(node, "ports", &port, &mut MergeStats::default())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("AddServicePortDecorator({})", self.port.name().unwrap_or("*"))
    }
}
