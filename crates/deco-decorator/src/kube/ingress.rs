//! Ingress rules
//!
//! [`AddIngressRuleDecorator`] merges one configured rule into the ingress
//! spec. Rules are keyed by host and paths by path and path type, so
//! several decorators for the same host build one rule with several paths,
//! in any order.

use crate::decorator::{Concept, Decorator, OrderingSpec, VisitContext};
use crate::error::DecorateError;
use crate::kube::{family, non_empty};
use crate::merge::{merge_into, MergeStats, Patch};
use deco_config::{IngressRuleConfig, Port, DEFAULT_PATH, DEFAULT_PATH_TYPE};
use deco_graph::{Node, NodeKind, ResourceRef, Selector};
use tracing::trace;

/// Property that selects the backend port of an ingress rule
pub const PORT_PROPERTY: &str = "kubernetes.ingress.service-port-name";

/// Property that names the application
pub const NAME_PROPERTY: &str = "kubernetes.name";

const INGRESS: &str = "Ingress";

const HTTP_PORT_NAMES: [&str; 4] = ["http", "https", "http1", "h2c"];
const HTTP_PORT_NUMBERS: [u16; 4] = [80, 443, 8080, 8443];

/// Port serving HTTP traffic
///
/// Prefers a well-known HTTP port name, then a well-known port number, then
/// the only port if there is exactly one.
#[must_use]
pub fn http_port(ports: &[Port]) -> Option<&Port> {
    ports
        .iter()
        .find(|p| p.name().is_some_and(|n| HTTP_PORT_NAMES.contains(&n)))
        .or_else(|| {
            ports
                .iter()
                .find(|p| p.container_port.is_some_and(|n| HTTP_PORT_NUMBERS.contains(&n)))
        })
        .or_else(|| match ports {
            [only] => Some(only),
            _ => None,
        })
}

/// Adds or merges an ingress rule
///
/// # Defaults
/// - path: rule path, then the default port path, then `/`
/// - path type: `Prefix`
/// - backend service: the application
/// - backend port: rule port name, then rule port number, then the default
///   port when the backend is the application itself
#[derive(Debug, Clone)]
pub struct AddIngressRuleDecorator {
    name: Selector,
    default_port: Option<Port>,
    rule: IngressRuleConfig,
}

impl AddIngressRuleDecorator {
    /// Create decorator for the ingress named `name`
    #[must_use]
    pub fn new(name: impl Into<Selector>, default_port: Option<Port>, rule: IngressRuleConfig) -> Self {
        Self {
            name: name.into(),
            default_port,
            rule,
        }
    }

    fn host(&self) -> Option<&str> {
        non_empty(self.rule.host.as_deref())
    }

    fn path(&self) -> &str {
        non_empty(self.rule.path.as_deref())
            .or_else(|| self.default_port.as_ref().and_then(Port::path))
            .unwrap_or(DEFAULT_PATH)
    }

    fn path_type(&self) -> &str {
        non_empty(self.rule.path_type.as_deref()).unwrap_or(DEFAULT_PATH_TYPE)
    }

    fn backend_port(&self, service: &str, application: &str) -> Result<Patch, DecorateError> {
        let port = Patch::new(NodeKind::ServiceBackendPort);

        if let Some(name) = non_empty(self.rule.service_port_name.as_deref()) {
            return Ok(port.owned("name", name));
        }
        if let Some(number) = self.rule.service_port_number.filter(|n| *n >= 0) {
            return Ok(port.owned("number", number));
        }
        if service != application {
            return Err(DecorateError::missing(
                PORT_PROPERTY,
                format!("The service port for '{service}' was not set"),
            ));
        }

        let default = self.default_port.as_ref().ok_or_else(|| {
            DecorateError::missing(
                PORT_PROPERTY,
                "Could not find any matching port to configure the Ingress Rule",
            )
        })?;
        if let Some(name) = default.name() {
            return Ok(port.owned("name", name));
        }
        default
            .service_port
            .or(default.container_port)
            .map(|number| port.owned("number", number))
            .ok_or_else(|| {
                DecorateError::missing(
                    PORT_PROPERTY,
                    "Could not find any matching port to configure the Ingress Rule",
                )
            })
    }

    fn patch(&self, application: &str) -> Result<Patch, DecorateError> {
        let service = non_empty(self.rule.service_name.as_deref()).unwrap_or(application);
        let port = self.backend_port(service, application)?;

        let backend = Patch::new(NodeKind::IngressBackend).slot(
            "service",
            Patch::new(NodeKind::ServiceBackend)
                .owned("name", service)
                .replace_slot("port", port),
        );
        let path = Patch::new(NodeKind::IngressPath)
            .owned("path", self.path())
            .owned("pathType", self.path_type())
            .slot("backend", backend);

        Ok(Patch::new(NodeKind::IngressRule)
            .owned_opt("host", self.host())
            .slot("http", Patch::new(NodeKind::HttpRuleValue).child("paths", path)))
    }
}

impl Decorator for AddIngressRuleDecorator {
    fn id(&self) -> &'static str {
        "AddIngressRuleDecorator"
    }

    fn target(&self) -> NodeKind {
        NodeKind::IngressSpec
    }

    fn selects(&self, resource: &ResourceRef) -> bool {
        resource.kind == INGRESS && self.name.matches(&resource.name)
    }

    fn unique_target_property(&self) -> Option<&'static str> {
        self.name.is_any().then_some(NAME_PROPERTY)
    }

    fn ordering(&self) -> OrderingSpec {
        OrderingSpec::new()
            .requires(Concept::new(family::RESOURCE, INGRESS))
            .provides(Concept::new(family::INGRESS_RULE, self.host().unwrap_or_default()))
    }

    fn visit(&self, node: &mut Node, context: &VisitContext) -> Result<(), DecorateError> {
        let application = self
            .name
            .as_exact()
            .or_else(|| context.resource_name())
            .ok_or_else(|| DecorateError::missing(NAME_PROPERTY, "The application name was not set"))?;

        let patch = self.patch(application)?;
        let mut stats = MergeStats::default();
        merge_into(node, "rules", &patch, &mut stats)?;
        trace!(
            host = self.host().unwrap_or_default(),
            path = self.path(),
            created = stats.created,
            merged = stats.merged,
            "merged ingress rule"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "AddIngressRuleDecorator({}{})",
            self.host().unwrap_or_default(),
            self.path()
        )
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
        graph
            .ensure_resource("networking.k8s.io/v1", "Ingress", "web")
            .unwrap();
        graph
    }

    fn rules(graph: &ResourceGraph) -> serde_json::Value {
        graph
            .resolve(&"spec.rules".parse().unwrap())
            .unwrap_or_default()
    }

    fn http() -> Option<Port> {
        Some(Port::new("http", 8080))
    }

    #[test]
    fn default_rule_uses_defaults() {
        let mut graph = graph();
        let decorator = AddIngressRuleDecorator::new("web", http(), IngressRuleConfig::default());
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(
            rules(&graph),
            json!([{
                "http": {"paths": [{
                    "path": "/",
                    "pathType": "Prefix",
                    "backend": {"service": {"name": "web", "port": {"name": "http"}}}
                }]}
            }])
        );
    }

    #[test]
    fn default_port_path_is_used() {
        let mut graph = graph();
        let port = Port::new("http", 8080).with_path("/app");
        let decorator = AddIngressRuleDecorator::new("web", Some(port), IngressRuleConfig::host("a.com"));
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(rules(&graph)[0]["http"]["paths"][0]["path"], json!("/app"));
    }

    #[test]
    fn two_paths_same_host_merge_in_either_order() {
        let v1 = AddIngressRuleDecorator::new("web", http(), IngressRuleConfig::host("a.com").with_path("/v1"));
        let v2 = AddIngressRuleDecorator::new("web", http(), IngressRuleConfig::host("a.com").with_path("/v2"));

        let mut forward = graph();
        apply(&v1, &mut forward).unwrap();
        apply(&v2, &mut forward).unwrap();

        let mut backward = graph();
        apply(&v2, &mut backward).unwrap();
        apply(&v1, &mut backward).unwrap();

        for graph in [&forward, &backward] {
            let rules = rules(graph);
            assert_eq!(rules.as_array().map(Vec::len), Some(1));
            let mut paths: Vec<String> = rules[0]["http"]["paths"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["path"].as_str().unwrap().to_string())
                .collect();
            paths.sort();
            assert_eq!(paths, vec!["/v1", "/v2"]);
        }
    }

    #[test]
    fn paths_route_to_their_own_services_in_either_order() {
        let root = AddIngressRuleDecorator::new(
            "web",
            http(),
            IngressRuleConfig::host("h1").with_path("/").with_service("s1").with_port_name("http"),
        );
        let admin = AddIngressRuleDecorator::new(
            "web",
            http(),
            IngressRuleConfig::host("h1").with_path("/admin").with_service("s2").with_port_name("http"),
        );

        for order in [[&root, &admin], [&admin, &root]] {
            let mut graph = graph();
            for decorator in order {
                apply(decorator, &mut graph).unwrap();
            }
            let rules = rules(&graph);
            assert_eq!(rules.as_array().map(Vec::len), Some(1));

            let mut routes: Vec<(String, String)> = rules[0]["http"]["paths"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| {
                    (
                        p["path"].as_str().unwrap_or_default().to_string(),
                        p["backend"]["service"]["name"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();
            routes.sort();
            assert_eq!(
                routes,
                vec![("/".to_string(), "s1".to_string()), ("/admin".to_string(), "s2".to_string())]
            );
        }
    }

    #[test]
    fn reapplying_is_idempotent() {
        let mut graph = graph();
        let decorator = AddIngressRuleDecorator::new("web", http(), IngressRuleConfig::host("a.com"));
        apply(&decorator, &mut graph).unwrap();
        let once = graph.clone();
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(graph, once);
    }

    #[test]
    fn existing_path_gets_backend_overwritten() {
        let mut graph = graph();
        apply(
            &AddIngressRuleDecorator::new("web", http(), IngressRuleConfig::host("a.com").with_port_number(80)),
            &mut graph,
        )
        .unwrap();
        apply(
            &AddIngressRuleDecorator::new(
                "web",
                http(),
                IngressRuleConfig::host("a.com").with_service("api").with_port_name("grpc"),
            ),
            &mut graph,
        )
        .unwrap();

        let paths = &rules(&graph)[0]["http"]["paths"];
        assert_eq!(paths.as_array().map(Vec::len), Some(1));
        assert_eq!(
            paths[0]["backend"],
            json!({"service": {"name": "api", "port": {"name": "grpc"}}})
        );
    }

    #[test]
    fn explicit_port_number() {
        let mut graph = graph();
        let rule = IngressRuleConfig::host("a.com").with_port_number(9000);
        apply(&AddIngressRuleDecorator::new("web", None, rule), &mut graph).unwrap();
        assert_eq!(
            rules(&graph)[0]["http"]["paths"][0]["backend"]["service"]["port"],
            json!({"number": 9000})
        );
    }

    #[test]
    fn missing_port_names_remediation() {
        let mut graph = graph();
        let before = graph.clone();
        let err = apply(
            &AddIngressRuleDecorator::new("web", None, IngressRuleConfig::host("a.com")),
            &mut graph,
        )
        .unwrap_err();
        assert_eq!(err.remediation(), Some(PORT_PROPERTY));
        assert!(err.to_string().contains("Could not find any matching port"));
        assert_eq!(graph, before);
    }

    #[test]
    fn other_service_without_port_is_rejected() {
        let mut graph = graph();
        let rule = IngressRuleConfig::host("a.com").with_service("api");
        let err = apply(&AddIngressRuleDecorator::new("web", http(), rule), &mut graph).unwrap_err();
        assert!(err.to_string().contains("The service port for 'api' was not set"));
    }

    #[test]
    fn wildcard_name_needs_unique_ingress() {
        let mut graph = graph();
        graph
            .ensure_resource("networking.k8s.io/v1", "Ingress", "admin")
            .unwrap();
        let decorator = AddIngressRuleDecorator::new(Selector::Any, http(), IngressRuleConfig::default());
        let err = apply(&decorator, &mut graph).unwrap_err();
        assert!(matches!(err, DecorateError::Ambiguous { .. }));
        assert_eq!(err.remediation(), Some("kubernetes.name"));
    }

    #[test]
    fn wildcard_name_defaults_service_to_resource() {
        let mut graph = graph();
        let decorator = AddIngressRuleDecorator::new(Selector::Any, http(), IngressRuleConfig::default());
        apply(&decorator, &mut graph).unwrap();
        assert_eq!(
            rules(&graph)[0]["http"]["paths"][0]["backend"]["service"]["name"],
            json!("web")
        );
    }

    #[test]
    fn http_port_selection() {
        let grpc = Port::new("grpc", 9000);
        let web = Port::new("web", 8080);
        let https = Port::new("https", 8443);

        assert_eq!(http_port(&[grpc.clone(), https.clone()]), Some(&https));
        assert_eq!(http_port(&[grpc.clone(), web.clone()]), Some(&web));
        assert_eq!(http_port(std::slice::from_ref(&grpc)), Some(&grpc));
        assert_eq!(http_port(&[grpc, Port::new("admin", 9090)]), None);
        assert_eq!(http_port(&[]), None);
    }
}
