//! Generation session
//!
//! A [`GenerationSession`] runs one pass:
//! 1. resolve [`KubernetesConfig`] through the configuration registry
//! 2. derive the built-in decorators from it and add user decorators
//! 3. order and apply every decorator to an empty resource graph
//! 4. resolve the config references of the applied decorators
//!
//! Nothing is returned unless every step succeeds.

use crate::error::GenerationError;
use crate::types::{GenerationOutput, SessionConfig};
use deco_config::{
    ApplyIngressDefaults, ApplyProjectInfo, ConfigReferenceResolver, ConfigurationRegistry, IngressRuleConfig,
    KubernetesConfig, Port, StaticGenerator,
};
use deco_decorator::kube::{
    http_port, AddAnnotationDecorator, AddContainerDecorator, AddEnvVarDecorator, AddIngressRuleDecorator,
    AddLabelDecorator, AddResourceDecorator, AddServicePortDecorator, ApplyReplicasDecorator, NAME_PROPERTY,
};
use deco_decorator::{DecorateError, Decorator, DecoratorRegistry};
use deco_graph::{ResourceGraph, ResourceRef};
use std::fmt;

/// Well-known label carrying the application name
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
/// Well-known label carrying the application version
pub const VERSION_LABEL: &str = "app.kubernetes.io/version";
/// Well-known label carrying the application group
pub const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";

/// One generation pass
pub struct GenerationSession {
    config: SessionConfig,
    configuration: ConfigurationRegistry,
    decorators: Vec<Box<dyn Decorator>>,
}

impl GenerationSession {
    /// Create session
    ///
    /// Registers the built-in overlays enabled in `config`.
    ///
    /// # Errors
    /// Returns [`GenerationError::Config`] if an overlay cannot be registered
    pub fn new(config: SessionConfig) -> Result<Self, GenerationError> {
        let mut configuration = ConfigurationRegistry::new(config.context());
        if config.apply_project_info {
            configuration.add_overlay::<KubernetesConfig, _>(ApplyProjectInfo)?;
        }
        if config.apply_ingress_defaults {
            configuration.add_overlay::<KubernetesConfig, _>(ApplyIngressDefaults)?;
        }

        Ok(Self {
            config,
            configuration,
            decorators: Vec::new(),
        })
    }

    /// Session settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Configuration registry, for additional generators and overlays
    #[inline]
    pub fn configuration(&mut self) -> &mut ConfigurationRegistry {
        &mut self.configuration
    }

    /// Seed the Kubernetes configuration
    ///
    /// # Errors
    /// Returns [`GenerationError::Config`] if a generator is already registered
    pub fn with_kubernetes(mut self, kubernetes: KubernetesConfig) -> Result<Self, GenerationError> {
        self.configuration
            .add_generator::<KubernetesConfig, _>(StaticGenerator(kubernetes))?;
        Ok(self)
    }

    /// Add a user decorator
    ///
    /// User decorators are registered after the built-in ones; their
    /// ordering declarations decide where they actually run.
    pub fn register(&mut self, decorator: impl Decorator + 'static) {
        self.decorators.push(Box::new(decorator));
    }

    /// Run the pass
    ///
    /// # Errors
    /// Returns the first configuration, ordering or decoration error; no
    /// partial output is produced
    pub fn generate(mut self) -> Result<GenerationOutput, GenerationError> {
        let kubernetes = self.configuration.resolve::<KubernetesConfig>()?;
        tracing::info!("Generating manifests for '{}'", kubernetes.name());

        let mut registry = DecoratorRegistry::new();
        registry.extend(kubernetes_decorators(&kubernetes)?);
        registry.extend(self.decorators);
        tracing::debug!("Registered {} decorators", registry.len());

        let mut graph = ResourceGraph::new();
        let report = registry.apply(&mut graph)?;

        if self.config.verify_idempotence {
            let mut again = graph.clone();
            registry.apply(&mut again)?;
            if let Some(changed) = first_difference(&graph, &again) {
                tracing::error!("Second pass changed {}", changed);
                return Err(GenerationError::NotIdempotent { changed });
            }
        }

        let references = ConfigReferenceResolver::new().resolve_all(&registry.config_references()?, &graph);
        tracing::info!(
            "Generated {} resources, {} config references",
            graph.len(),
            references.len()
        );

        Ok(GenerationOutput {
            graph,
            references,
            report,
            format: self.config.output,
        })
    }
}

impl fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSession")
            .field("config", &self.config)
            .field("configuration", &self.configuration)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

/// Built-in decorators for a resolved configuration
///
/// Produces a deployment, a service and, when exposed, an ingress, all
/// named after the application.
///
/// # Errors
/// Returns [`DecorateError::MissingReference`] if the application name is unset
pub fn kubernetes_decorators(config: &KubernetesConfig) -> Result<Vec<Box<dyn Decorator>>, DecorateError> {
    let name = config
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DecorateError::missing(NAME_PROPERTY, "The application name was not set"))?;

    let mut decorators: Vec<Box<dyn Decorator>> = vec![
        Box::new(AddResourceDecorator::deployment(name)),
        Box::new(AddResourceDecorator::service(name)),
    ];

    let mut container = AddContainerDecorator::new(name, name).with_ports(config.ports.iter().cloned());
    if let Some(image) = &config.image {
        container = container.with_image(image.as_str());
    }
    decorators.push(Box::new(container));

    if let Some(replicas) = config.replicas {
        decorators.push(Box::new(ApplyReplicasDecorator::new(name, replicas)));
    }
    for (key, value) in &config.env {
        decorators.push(Box::new(
            AddEnvVarDecorator::new(key.as_str(), value.as_str())
                .for_deployment(name)
                .for_container(name),
        ));
    }
    for port in &config.ports {
        decorators.push(Box::new(AddServicePortDecorator::new(name, port.clone())));
    }

    let well_known = [
        (NAME_LABEL, Some(name)),
        (VERSION_LABEL, config.version.as_deref()),
        (PART_OF_LABEL, config.part_of.as_deref()),
    ];
    let labels = well_known
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .chain(config.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    for (key, value) in labels {
        decorators.push(Box::new(AddLabelDecorator::new(key, value).for_name(name)));
    }
    for (key, value) in &config.annotations {
        decorators.push(Box::new(AddAnnotationDecorator::new(key.as_str(), value.as_str())));
    }

    if config.exposes_ingress() {
        let mut ingress = AddResourceDecorator::ingress(name);
        if let Some(class) = &config.ingress.ingress_class_name {
            ingress = ingress.with_spec_field("ingressClassName", class.as_str());
        }
        decorators.push(Box::new(ingress));

        let default_port = ingress_port(config).cloned();
        let default_rule = IngressRuleConfig {
            host: config.ingress.host.clone(),
            ..IngressRuleConfig::default()
        };
        for rule in std::iter::once(default_rule).chain(config.ingress.rules.iter().cloned()) {
            decorators.push(Box::new(AddIngressRuleDecorator::new(name, default_port.clone(), rule)));
        }
    }

    Ok(decorators)
}

/// Port the default ingress rule routes to
///
/// The configured target port wins; otherwise the HTTP port.
fn ingress_port(config: &KubernetesConfig) -> Option<&Port> {
    config
        .ingress
        .target_port
        .as_deref()
        .and_then(|target| config.ports.iter().find(|p| p.name() == Some(target)))
        .or_else(|| http_port(&config.ports))
}

/// First resource that differs between two graphs
fn first_difference(left: &ResourceGraph, right: &ResourceGraph) -> Option<String> {
    if left == right {
        return None;
    }
    if left.len() != right.len() {
        return Some(format!("the resource count ({} to {})", left.len(), right.len()));
    }
    let changed = left
        .resources()
        .iter()
        .zip(right.resources())
        .find(|(l, r)| l != r)
        .and_then(|(l, _)| ResourceRef::of(l));
    Some(changed.map_or_else(|| "the resource list".to_string(), |r| r.to_string()))
}
