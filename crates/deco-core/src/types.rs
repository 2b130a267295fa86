//! Core types for Deco
//!
//! Defines the settings of a generation session and the shape of its
//! output:
//! - Session settings and output format
//! - Generated manifests with their resolved config references

use crate::error::GenerationError;
use deco_config::{GenerationContext, ProjectInfo, ResolvedReference};
use deco_decorator::ApplyReport;
use deco_graph::ResourceGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialized manifest format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// YAML document
    #[default]
    Yaml,
    /// Pretty printed JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(GenerationError::Settings(format!("unknown output format '{other}'"))),
        }
    }
}

/// Settings of a generation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Project coordinates handed to configuration generators
    pub project: ProjectInfo,
    /// Active profile
    pub profile: Option<String>,
    /// Manifest format
    pub output: OutputFormat,
    /// Fill name, version and image from the project coordinates
    pub apply_project_info: bool,
    /// Derive ingress exposure and target port from the configuration
    pub apply_ingress_defaults: bool,
    /// Apply the decorators a second time and fail if anything changes
    pub verify_idempotence: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            project: ProjectInfo::default(),
            profile: None,
            output: OutputFormat::Yaml,
            apply_project_info: true,
            apply_ingress_defaults: true,
            verify_idempotence: false,
        }
    }
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from YAML
    ///
    /// # Errors
    /// Returns [`GenerationError::Settings`] if the document does not parse
    pub fn from_yaml(yaml: &str) -> Result<Self, GenerationError> {
        serde_yaml::from_str(yaml).map_err(|e| GenerationError::Settings(e.to_string()))
    }

    /// Load settings from JSON
    ///
    /// # Errors
    /// Returns [`GenerationError::Settings`] if the document does not parse
    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        serde_json::from_str(json).map_err(|e| GenerationError::Settings(e.to_string()))
    }

    /// With project coordinates
    #[inline]
    #[must_use]
    pub fn with_project(mut self, project: ProjectInfo) -> Self {
        self.project = project;
        self
    }

    /// With profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// With output format
    #[inline]
    #[must_use]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// With project info overlay enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_project_info(mut self, enabled: bool) -> Self {
        self.apply_project_info = enabled;
        self
    }

    /// With ingress defaults overlay enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_ingress_defaults(mut self, enabled: bool) -> Self {
        self.apply_ingress_defaults = enabled;
        self
    }

    /// With idempotence verification
    #[inline]
    #[must_use]
    pub fn with_idempotence_check(mut self, enabled: bool) -> Self {
        self.verify_idempotence = enabled;
        self
    }

    /// Context handed to configuration generators
    #[must_use]
    pub fn context(&self) -> GenerationContext {
        let context = GenerationContext::new(self.project.clone());
        match &self.profile {
            Some(profile) => context.with_profile(profile.as_str()),
            None => context,
        }
    }
}

/// Result of a generation pass
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Decorated resource graph
    pub graph: ResourceGraph,
    /// Config references in decorator order
    pub references: Vec<ResolvedReference>,
    /// Application counters
    pub report: ApplyReport,
    /// Format used by [`render`](Self::render)
    pub format: OutputFormat,
}

impl GenerationOutput {
    /// Serialize the manifest in the session's format
    ///
    /// # Errors
    /// Returns [`GenerationError::Graph`] if serialization fails
    pub fn render(&self) -> Result<String, GenerationError> {
        match self.format {
            OutputFormat::Yaml => self.to_yaml(),
            OutputFormat::Json => self.to_json(),
        }
    }

    /// Serialize the manifest as YAML
    ///
    /// # Errors
    /// Returns [`GenerationError::Graph`] if serialization fails
    pub fn to_yaml(&self) -> Result<String, GenerationError> {
        Ok(self.graph.to_yaml()?)
    }

    /// Serialize the manifest as JSON
    ///
    /// # Errors
    /// Returns [`GenerationError::Graph`] if serialization fails
    pub fn to_json(&self) -> Result<String, GenerationError> {
        Ok(self.graph.to_json()?)
    }

    /// Resolved reference for a property
    #[must_use]
    pub fn reference(&self, property: &str) -> Option<&ResolvedReference> {
        self.references.iter().find(|r| r.property == property)
    }

    /// Serialize the resolved references as JSON
    ///
    /// # Errors
    /// Returns [`GenerationError::Settings`] if serialization fails
    pub fn references_json(&self) -> Result<String, GenerationError> {
        serde_json::to_string_pretty(&self.references).map_err(|e| GenerationError::Settings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_config_builder() {
        let config = SessionConfig::new()
            .with_project(ProjectInfo::new("web").with_version("1.0"))
            .with_profile("prod")
            .with_output(OutputFormat::Json)
            .with_idempotence_check(true);

        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.apply_project_info);
        assert!(config.verify_idempotence);

        let context = config.context();
        assert_eq!(context.project.name.as_deref(), Some("web"));
        assert_eq!(context.profile.as_deref(), Some("prod"));
    }

    #[test]
    fn session_config_from_yaml() {
        let yaml = r"
project:
  name: web
  version: '2.0'
profile: staging
output: json
apply-ingress-defaults: false
";
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.version.as_deref(), Some("2.0"));
        assert_eq!(config.output, OutputFormat::Json);
        assert!(!config.apply_ingress_defaults);
        // omitted keys keep their defaults
        assert!(config.apply_project_info);
        assert!(!config.verify_idempotence);
    }

    #[test]
    fn session_config_rejects_garbage() {
        assert!(matches!(
            SessionConfig::from_json("{\"output\": \"xml\"}"),
            Err(GenerationError::Settings(_))
        ));
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("toml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
