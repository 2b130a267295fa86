//! Deco Configuration
//!
//! Typed configuration objects resolved once per generation pass.
//!
//! # Core Concepts
//!
//! - [`Configuration`]: Typed configuration with "set if unset" merge
//! - [`ConfigurationRegistry`]: One generator and ordered overlays per type
//! - [`KubernetesConfig`]: Configuration of the generated resources
//! - [`ConfigReference`]: Property name plus the graph paths its value lands on
//! - [`ConfigReferenceResolver`]: Resolves references against a decorated graph
//!
//! # Example
//!
//! ```rust,ignore
//! use deco_config::{ApplyProjectInfo, ConfigurationRegistry, KubernetesConfig, StaticGenerator};
//!
//! let mut registry = ConfigurationRegistry::default();
//! registry.add_generator(StaticGenerator(KubernetesConfig::from_yaml(yaml)?))?;
//! registry.add_overlay::<KubernetesConfig, _>(ApplyProjectInfo)?;
//! let config = registry.resolve::<KubernetesConfig>()?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod configuration;
mod kubernetes;
mod reference;
mod registry;

pub use configuration::{fill, fill_map, fill_vec, Configuration, GenerationContext, ProjectAware, ProjectInfo};
pub use kubernetes::{
    ApplyDefaults, ApplyIngressDefaults, IngressConfig, IngressRuleConfig, KubernetesConfig, Port,
    DEFAULT_PATH, DEFAULT_PATH_TYPE,
};
pub use reference::{join_properties, ConfigReference, ConfigReferenceResolver, ResolvedReference, ResolvedValue};
pub use registry::{ApplyProjectInfo, ConfigError, ConfigGenerator, Configurator, ConfigurationRegistry, StaticGenerator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn overlays_never_override_generated_replicas(seeded in 1u32..50, overlay in 1u32..50) {
            let mut registry = ConfigurationRegistry::default();
            registry
                .add_generator(StaticGenerator(KubernetesConfig {
                    replicas: Some(seeded),
                    ..KubernetesConfig::default()
                }))
                .unwrap();
            registry
                .add_overlay(ApplyDefaults(KubernetesConfig {
                    replicas: Some(overlay),
                    ..KubernetesConfig::default()
                }))
                .unwrap();
            prop_assert_eq!(registry.resolve::<KubernetesConfig>().unwrap().replicas, Some(seeded));
        }
    }

    #[test]
    fn resolved_config_feeds_references() {
        let mut registry = ConfigurationRegistry::new(GenerationContext::new(ProjectInfo::new("web")));
        registry.add_overlay::<KubernetesConfig, _>(ApplyProjectInfo).unwrap();
        let config = registry.resolve::<KubernetesConfig>().unwrap();

        let reference = ConfigReference::parse(
            join_properties(&[deco_graph::Selector::exact(config.name()), "replicas".into()]),
            "spec.replicas",
        )
        .unwrap();
        assert_eq!(reference.property(), "web.replicas");
    }
}
