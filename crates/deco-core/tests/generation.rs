//! End-to-end generation passes

use deco_config::{ApplyDefaults, KubernetesConfig, ResolvedValue};
use deco_core::{kubernetes_decorators, GenerationError, GenerationSession, SessionConfig};
use deco_decorator::kube::PORT_PROPERTY;
use deco_decorator::{Concept, DecoratorRegistry, OrderingError, OrderingSpec};
use deco_graph::ResourceRef;
use deco_test_utils::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn second_pass_changes_nothing() -> anyhow::Result<()> {
    let config = exposed_kubernetes_config();
    let output = sample_session(config.clone()).generate()?;

    let mut registry = DecoratorRegistry::new();
    registry.extend(kubernetes_decorators(&config)?);
    let mut graph = output.graph.clone();
    registry.apply(&mut graph)?;

    assert_eq!(graph.to_yaml()?, output.to_yaml()?);
    Ok(())
}

#[test]
fn identical_inputs_give_identical_json() -> anyhow::Result<()> {
    let first = sample_session(exposed_kubernetes_config()).generate()?.to_json()?;
    let second = sample_session(exposed_kubernetes_config()).generate()?.to_json()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn two_paths_for_one_host_in_either_order() -> anyhow::Result<()> {
    for paths in [["/v1", "/v2"], ["/v2", "/v1"]] {
        let mut graph = ingress_graph();
        ingress_registry(&paths).apply(&mut graph)?;

        let rules = value_at(&graph, "spec.rules");
        assert_eq!(rules.as_array().map(Vec::len), Some(1), "one rule for {paths:?}");
        assert_eq!(rules[0]["host"], json!(HOST));

        let mut found: Vec<_> = rules[0]["http"]["paths"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|p| p["path"].clone())
            .collect();
        found.sort_by_key(ToString::to_string);
        assert_eq!(found, vec![json!("/v1"), json!("/v2")]);
    }
    Ok(())
}

#[test]
fn cycle_names_every_participant() {
    let mut session = sample_session(sample_kubernetes_config());
    session.register(OrderingOnly::new(
        "Alpha",
        OrderingSpec::new()
            .provides(Concept::new("token", "a"))
            .requires(Concept::new("token", "b")),
    ));
    session.register(OrderingOnly::new(
        "Beta",
        OrderingSpec::new()
            .provides(Concept::new("token", "b"))
            .requires(Concept::new("token", "a")),
    ));

    let err = session.generate().unwrap_err();
    let GenerationError::Decorate(deco_decorator::DecorateError::Ordering(OrderingError::Cycle {
        participants, ..
    })) = &err
    else {
        panic!("expected cycle, got {err}");
    };
    assert_eq!(participants.len(), 2);
    assert!(participants.iter().any(|p| p.starts_with("Alpha")));
    assert!(participants.iter().any(|p| p.starts_with("Beta")));
    assert!(!err.is_retryable());
}

#[test]
fn exposed_without_ports_asks_for_port_name() {
    let config = KubernetesConfig {
        ports: Vec::new(),
        ..exposed_kubernetes_config()
    };
    let err = sample_session(config).generate().unwrap_err();
    assert_eq!(err.remediation(), Some(PORT_PROPERTY));
    assert!(err.to_string().contains(PORT_PROPERTY));
}

#[test]
fn overlays_never_clobber_configured_values() -> anyhow::Result<()> {
    let mut session = sample_session(sample_kubernetes_config());
    let defaults = KubernetesConfig {
        replicas: Some(9),
        labels: [("team".to_string(), "platform".to_string())].into_iter().collect(),
        ..KubernetesConfig::default()
    };
    session
        .configuration()
        .add_overlay::<KubernetesConfig, _>(ApplyDefaults(defaults))?;
    let output = session.generate()?;

    let deployment = output
        .graph
        .resource(&ResourceRef::new("Deployment", APP))
        .ok_or_else(|| anyhow::anyhow!("no deployment"))?;
    assert_eq!(deployment.path_field(&["spec", "replicas"]), Some(&json!(2)));
    assert_eq!(
        deployment.path_field(&["metadata", "labels", "team"]),
        Some(&json!("platform"))
    );
    Ok(())
}

#[test]
fn replicas_reference_resolves_to_configured_value() -> anyhow::Result<()> {
    let output = sample_session(sample_kubernetes_config()).generate()?;
    let replicas = output
        .reference("web.replicas")
        .ok_or_else(|| anyhow::anyhow!("no replicas reference"))?;
    assert_eq!(replicas.value, ResolvedValue::Value(json!(2)));
    assert_eq!(replicas.profile, None);
    Ok(())
}

#[test]
fn duplicate_generator_is_refused() {
    let session = GenerationSession::new(SessionConfig::new())
        .unwrap()
        .with_kubernetes(sample_kubernetes_config())
        .unwrap();
    let err = session.with_kubernetes(sample_kubernetes_config()).unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn same_host_paths_share_one_rule_in_registration_order(order in permutation(4)) {
        let paths = ["/a", "/b", "/c", "/d"];
        let shuffled: Vec<&str> = order.iter().map(|&i| paths[i]).collect();

        let mut graph = ingress_graph();
        ingress_registry(&shuffled).apply(&mut graph).unwrap();

        let rules = value_at(&graph, "spec.rules");
        prop_assert_eq!(rules.as_array().map(Vec::len), Some(1));
        let applied: Vec<_> = rules[0]["http"]["paths"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|p| p["path"].as_str().map(str::to_string))
            .collect();
        prop_assert_eq!(applied, shuffled.iter().map(|p| (*p).to_string()).collect::<Vec<_>>());
    }
}
