//! Kubernetes configuration
//!
//! The typed configuration the manifest decorators are built from, plus the
//! overlays shipped with it.

use crate::configuration::{fill, fill_map, fill_vec, Configuration, GenerationContext, ProjectAware, ProjectInfo};
use crate::registry::{ConfigError, Configurator};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default path type of generated ingress paths
pub const DEFAULT_PATH_TYPE: &str = "Prefix";

/// Default path of generated ingress paths
pub const DEFAULT_PATH: &str = "/";

/// Exposed port of the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Port {
    /// Port name (`http`, `grpc`, ...)
    pub name: Option<String>,
    /// Container port number
    pub container_port: Option<u16>,
    /// Port exposed by the service, defaults to the container port
    pub service_port: Option<u16>,
    /// HTTP path served on the port
    pub path: Option<String>,
    /// Protocol, defaults to TCP
    pub protocol: Option<String>,
}

impl Port {
    /// Create named port
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, container_port: u16) -> Self {
        Self {
            name: Some(name.into()),
            container_port: Some(container_port),
            ..Self::default()
        }
    }

    /// With path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// With service port
    #[inline]
    #[must_use]
    pub fn with_service_port(mut self, port: u16) -> Self {
        self.service_port = Some(port);
        self
    }

    /// Name, if set and non-empty
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Path, if set and non-empty
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

/// One configured ingress rule
///
/// Every field is optional; missing values are defaulted when the rule is
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IngressRuleConfig {
    /// Host, absent for the default rule
    pub host: Option<String>,
    /// Path, defaults to the port path or `/`
    pub path: Option<String>,
    /// Path type, defaults to `Prefix`
    pub path_type: Option<String>,
    /// Backend service, defaults to the application
    pub service_name: Option<String>,
    /// Backend service port name
    pub service_port_name: Option<String>,
    /// Backend service port number
    pub service_port_number: Option<i32>,
}

impl IngressRuleConfig {
    /// Rule for a host
    #[inline]
    #[must_use]
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// With path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// With path type
    #[inline]
    #[must_use]
    pub fn with_path_type(mut self, path_type: impl Into<String>) -> Self {
        self.path_type = Some(path_type.into());
        self
    }

    /// With backend service
    #[inline]
    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// With backend port name
    #[inline]
    #[must_use]
    pub fn with_port_name(mut self, name: impl Into<String>) -> Self {
        self.service_port_name = Some(name.into());
        self
    }

    /// With backend port number
    #[inline]
    #[must_use]
    pub fn with_port_number(mut self, number: i32) -> Self {
        self.service_port_number = Some(number);
        self
    }
}

/// Ingress exposure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IngressConfig {
    /// Generate an ingress
    pub expose: Option<bool>,
    /// Host of the default rule
    pub host: Option<String>,
    /// `spec.ingressClassName`
    pub ingress_class_name: Option<String>,
    /// Name of the port the default rule routes to
    pub target_port: Option<String>,
    /// Additional rules
    pub rules: Vec<IngressRuleConfig>,
}

impl IngressConfig {
    fn fill_unset(&mut self, defaults: &Self) {
        fill(&mut self.expose, &defaults.expose);
        fill(&mut self.host, &defaults.host);
        fill(&mut self.ingress_class_name, &defaults.ingress_class_name);
        fill(&mut self.target_port, &defaults.target_port);
        fill_vec(&mut self.rules, &defaults.rules);
    }
}

/// Configuration of the generated Kubernetes resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KubernetesConfig {
    /// Application name, used for every generated resource
    pub name: Option<String>,
    /// Application version
    pub version: Option<String>,
    /// Group the application belongs to
    pub part_of: Option<String>,
    /// Container image
    pub image: Option<String>,
    /// Deployment replicas
    pub replicas: Option<u32>,
    /// Exposed ports
    pub ports: Vec<Port>,
    /// Extra labels
    pub labels: IndexMap<String, String>,
    /// Extra annotations
    pub annotations: IndexMap<String, String>,
    /// Container environment
    pub env: IndexMap<String, String>,
    /// Ingress exposure
    pub ingress: IngressConfig,
}

impl KubernetesConfig {
    /// Parse from YAML
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the document does not parse
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the document does not parse
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Application name, empty when unset
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Whether an ingress should be generated
    #[inline]
    #[must_use]
    pub fn exposes_ingress(&self) -> bool {
        self.ingress.expose.unwrap_or(false)
    }
}

impl Configuration for KubernetesConfig {
    const NAME: &'static str = "kubernetes";

    fn fill_unset(&mut self, defaults: &Self) {
        fill(&mut self.name, &defaults.name);
        fill(&mut self.version, &defaults.version);
        fill(&mut self.part_of, &defaults.part_of);
        fill(&mut self.image, &defaults.image);
        fill(&mut self.replicas, &defaults.replicas);
        fill_vec(&mut self.ports, &defaults.ports);
        fill_map(&mut self.labels, &defaults.labels);
        fill_map(&mut self.annotations, &defaults.annotations);
        fill_map(&mut self.env, &defaults.env);
        self.ingress.fill_unset(&defaults.ingress);
    }
}

impl ProjectAware for KubernetesConfig {
    fn from_project(project: &ProjectInfo) -> Self {
        let image = project.name.as_ref().map(|name| {
            let version = project.version.as_deref().unwrap_or("latest");
            match &project.group {
                Some(group) => format!("{group}/{name}:{version}"),
                None => format!("{name}:{version}"),
            }
        });
        Self {
            name: project.name.clone(),
            version: project.version.clone(),
            part_of: project.group.clone(),
            image,
            ..Self::default()
        }
    }
}

/// Overlay deriving ingress defaults from the rest of the configuration
///
/// The default rule routes to the first port unless a target port is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyIngressDefaults;

impl Configurator<KubernetesConfig> for ApplyIngressDefaults {
    fn configure(&self, current: &KubernetesConfig, _context: &GenerationContext) -> KubernetesConfig {
        let target_port = current.ports.first().and_then(|p| p.name.clone());
        KubernetesConfig {
            ingress: IngressConfig {
                expose: Some(!current.ingress.rules.is_empty() || current.ingress.host.is_some()),
                target_port,
                ..IngressConfig::default()
            },
            ..KubernetesConfig::default()
        }
    }
}

/// Overlay applying fixed defaults
#[derive(Debug, Clone, Default)]
pub struct ApplyDefaults(pub KubernetesConfig);

impl Configurator<KubernetesConfig> for ApplyDefaults {
    fn configure(&self, _current: &KubernetesConfig, _context: &GenerationContext) -> KubernetesConfig {
        self.0.clone()
    }
}
