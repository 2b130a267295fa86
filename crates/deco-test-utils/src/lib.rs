//! Testing utilities for Deco workspace
//!
//! Shared fixtures, decorators and strategies.

#![allow(missing_docs)]

use deco_config::{IngressConfig, IngressRuleConfig, KubernetesConfig, Port};
use deco_core::{GenerationSession, SessionConfig};
use deco_decorator::kube::{AddIngressRuleDecorator, AddResourceDecorator};
use deco_decorator::{DecorateError, Decorator, DecoratorRegistry, OrderingSpec, VisitContext};
use deco_graph::{Node, NodeKind, ResourceGraph};
use proptest::prelude::*;

pub const APP: &str = "web";
pub const HOST: &str = "web.example.com";

pub fn http_port() -> Port {
    Port::new("http", 8080)
}

/// Configuration of a deployment with one HTTP port and two replicas
pub fn sample_kubernetes_config() -> KubernetesConfig {
    KubernetesConfig {
        name: Some(APP.to_string()),
        version: Some("1.0".to_string()),
        image: Some("registry.example.com/web:1.0".to_string()),
        replicas: Some(2),
        ports: vec![http_port()],
        ..KubernetesConfig::default()
    }
}

/// [`sample_kubernetes_config`] exposed through an ingress
pub fn exposed_kubernetes_config() -> KubernetesConfig {
    KubernetesConfig {
        ingress: IngressConfig {
            host: Some(HOST.to_string()),
            rules: vec![IngressRuleConfig::host(HOST).with_path("/api")],
            ..IngressConfig::default()
        },
        ..sample_kubernetes_config()
    }
}

pub fn sample_session(kubernetes: KubernetesConfig) -> GenerationSession {
    GenerationSession::new(SessionConfig::new().with_idempotence_check(true))
        .unwrap()
        .with_kubernetes(kubernetes)
        .unwrap()
}

/// Graph holding an empty ingress named [`APP`]
pub fn ingress_graph() -> ResourceGraph {
    let mut graph = ResourceGraph::new();
    graph
        .ensure_resource("networking.k8s.io/v1", "Ingress", APP)
        .unwrap();
    graph
}

/// Ingress rule decorator for [`HOST`] and `path`
pub fn rule_for_path(path: &str) -> AddIngressRuleDecorator {
    AddIngressRuleDecorator::new(APP, Some(http_port()), IngressRuleConfig::host(HOST).with_path(path))
}

/// Registry creating the ingress and one rule per path, in the given order
pub fn ingress_registry(paths: &[&str]) -> DecoratorRegistry {
    let mut registry = DecoratorRegistry::new();
    for path in paths {
        registry.register(rule_for_path(path));
    }
    registry.register(AddResourceDecorator::ingress(APP));
    registry
}

/// Decorator that only declares ordering
#[derive(Debug, Clone)]
pub struct OrderingOnly {
    pub id: &'static str,
    pub spec: OrderingSpec,
}

impl OrderingOnly {
    pub fn new(id: &'static str, spec: OrderingSpec) -> Self {
        Self { id, spec }
    }
}

impl Decorator for OrderingOnly {
    fn id(&self) -> &'static str {
        self.id
    }

    fn target(&self) -> NodeKind {
        NodeKind::List
    }

    fn ordering(&self) -> OrderingSpec {
        self.spec.clone()
    }

    fn visit(&self, _node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
        Ok(())
    }
}

/// Permutations of `0..n`
pub fn permutation(n: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..n).collect::<Vec<_>>()).prop_shuffle()
}

/// Value at a dotted path of the first resource that has it
pub fn value_at(graph: &ResourceGraph, path: &str) -> serde_json::Value {
    graph
        .resolve(&path.parse().unwrap())
        .unwrap_or_default()
}
