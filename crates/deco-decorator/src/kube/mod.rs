//! Built-in Kubernetes decorators
//!
//! Every decorator here builds a [`Patch`](crate::Patch) of the sub-tree it
//! wants and merges it by key, so re-applying it is a no-op.

mod ingress;
mod metadata;
mod resource;
mod service;
mod workload;

pub use ingress::{http_port, AddIngressRuleDecorator, NAME_PROPERTY, PORT_PROPERTY};
pub use metadata::{AddAnnotationDecorator, AddLabelDecorator, RemoveLabelDecorator};
pub use resource::AddResourceDecorator;
pub use service::AddServicePortDecorator;
pub use workload::{AddContainerDecorator, AddEnvVarDecorator, ApplyReplicasDecorator};

/// Concept families used by the built-in decorators
pub mod family {
    /// A resource of a kind exists
    pub const RESOURCE: &str = "resource";
    /// Metadata label
    pub const LABEL: &str = "label";
    /// Metadata annotation
    pub const ANNOTATION: &str = "annotation";
    /// Container of a workload
    pub const CONTAINER: &str = "container";
    /// Container environment variable
    pub const ENV: &str = "env";
    /// Workload replica count
    pub const REPLICAS: &str = "replicas";
    /// Service port
    pub const SERVICE_PORT: &str = "service-port";
    /// Ingress rule, keyed by host
    pub const INGRESS_RULE: &str = "ingress-rule";
}

/// Non-empty string
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
