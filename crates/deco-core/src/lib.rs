//! Deco Core - Manifest Generation
//!
//! Runs a complete generation pass:
//! - Resolves the typed configuration through generators and overlays
//! - Derives the built-in decorators and orders them with user decorators
//! - Applies them to a fresh resource graph, all or nothing
//! - Resolves the config references of the applied decorators
//!
//! # Example
//!
//! ```rust,ignore
//! use deco_core::prelude::*;
//!
//! let kubernetes = KubernetesConfig::from_yaml(yaml)?;
//! let output = GenerationSession::new(SessionConfig::new())?
//!     .with_kubernetes(kubernetes)?
//!     .generate()?;
//!
//! println!("{}", output.render()?);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use error::GenerationError;
pub use session::{kubernetes_decorators, GenerationSession, NAME_LABEL, PART_OF_LABEL, VERSION_LABEL};
pub use telemetry::{init_tracing, init_tracing_with, TelemetryConfig, TelemetryError};
pub use types::{GenerationOutput, OutputFormat, SessionConfig};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a generation pass
    pub use crate::{GenerationError, GenerationOutput, GenerationSession, OutputFormat, SessionConfig};
    pub use deco_config::{IngressConfig, IngressRuleConfig, KubernetesConfig, Port, ProjectInfo};
    pub use deco_decorator::{Decorator, DecoratorRegistry};
    pub use deco_graph::{ResourceGraph, ResourceRef, Selector};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r"
name: web
version: '1.0'
replicas: 3
ports:
  - name: http
    container-port: 8080
env:
  MODE: prod
ingress:
  host: web.example.com
  rules:
    - host: web.example.com
      path: /api
";

    #[test]
    fn yaml_config_to_manifest() {
        let output = GenerationSession::new(SessionConfig::new().with_idempotence_check(true))
            .unwrap()
            .with_kubernetes(KubernetesConfig::from_yaml(CONFIG).unwrap())
            .unwrap()
            .generate()
            .unwrap();

        assert_eq!(output.graph.len(), 3);
        let yaml = output.render().unwrap();
        assert!(yaml.contains("kind: Ingress"));
        assert!(yaml.contains("path: /api"));
        assert!(yaml.contains("MODE"));
        // default rule and the configured rule share the host
        assert_eq!(yaml.matches("host: web.example.com").count(), 1);
    }

    #[test]
    fn json_output() {
        let output = GenerationSession::new(SessionConfig::new().with_output(OutputFormat::Json))
            .unwrap()
            .with_kubernetes(KubernetesConfig::from_yaml(CONFIG).unwrap())
            .unwrap()
            .generate()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output.render().unwrap()).unwrap();
        assert_eq!(value["kind"], "List");
        assert_eq!(value["items"][0]["spec"]["replicas"], 3);
    }
}
