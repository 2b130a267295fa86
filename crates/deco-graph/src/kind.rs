//! Node kinds and their schema
//!
//! [`NodeKind`] is the closed set of manifest elements the graph knows about.
//! Each kind declares which fields form its semantic key and which kinds
//! live in its named slots and collections. Dispatch over the graph is done
//! by matching on this enum rather than through per-kind visitor types.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind tag of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root list of resources
    List,
    /// Top-level resource (`apiVersion`, `kind`, `metadata`, `spec`)
    Resource,
    /// Object metadata (name, namespace, labels, annotations)
    Metadata,
    /// Flat string map (labels, annotations, selectors)
    Map,
    /// Ingress spec holding the rule list
    IngressSpec,
    /// Ingress rule, keyed by host
    IngressRule,
    /// HTTP section of an ingress rule
    HttpRuleValue,
    /// HTTP path, keyed by path and path type
    IngressPath,
    /// Backend of an ingress path
    IngressBackend,
    /// Service reference of an ingress backend
    ServiceBackend,
    /// Port of a service backend (name or number)
    ServiceBackendPort,
    /// Deployment spec
    DeploymentSpec,
    /// Pod template of a deployment
    PodTemplate,
    /// Pod spec holding the container list
    PodSpec,
    /// Container, keyed by name
    Container,
    /// Environment variable, keyed by name
    EnvVar,
    /// Container port, keyed by name
    ContainerPort,
    /// Service spec
    ServiceSpec,
    /// Service port, keyed by name
    ServicePort,
    /// Untyped object; accepts any slot or collection
    Object,
}

/// One field participating in a semantic key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField {
    /// Slot names followed by the field name
    pub path: &'static [&'static str],

    /// Absent or empty value makes the key unmatchable when `true`
    pub required: bool,
}

impl KeyField {
    const fn required(path: &'static [&'static str]) -> Self {
        Self {
            path,
            required: true,
        }
    }

    const fn optional(path: &'static [&'static str]) -> Self {
        Self {
            path,
            required: false,
        }
    }

    /// Field name (last path element)
    #[inline]
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.path.last().copied().unwrap_or_default()
    }
}

const RESOURCE_KEY: &[KeyField] = &[
    KeyField::required(&["kind"]),
    KeyField::required(&["metadata", "name"]),
];
const RULE_KEY: &[KeyField] = &[KeyField::optional(&["host"])];
const PATH_KEY: &[KeyField] = &[
    KeyField::required(&["path"]),
    KeyField::required(&["pathType"]),
];
const NAME_KEY: &[KeyField] = &[KeyField::required(&["name"])];

impl NodeKind {
    /// Stable name of the kind
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Resource => "Resource",
            Self::Metadata => "Metadata",
            Self::Map => "Map",
            Self::IngressSpec => "IngressSpec",
            Self::IngressRule => "IngressRule",
            Self::HttpRuleValue => "HttpRuleValue",
            Self::IngressPath => "IngressPath",
            Self::IngressBackend => "IngressBackend",
            Self::ServiceBackend => "ServiceBackend",
            Self::ServiceBackendPort => "ServiceBackendPort",
            Self::DeploymentSpec => "DeploymentSpec",
            Self::PodTemplate => "PodTemplate",
            Self::PodSpec => "PodSpec",
            Self::Container => "Container",
            Self::EnvVar => "EnvVar",
            Self::ContainerPort => "ContainerPort",
            Self::ServiceSpec => "ServiceSpec",
            Self::ServicePort => "ServicePort",
            Self::Object => "Object",
        }
    }

    /// Fields forming the semantic key among siblings
    ///
    /// Kinds that only ever live in slots have no key.
    #[must_use]
    pub fn key_fields(self) -> &'static [KeyField] {
        match self {
            Self::Resource => RESOURCE_KEY,
            Self::IngressRule => RULE_KEY,
            Self::IngressPath => PATH_KEY,
            Self::Container | Self::EnvVar | Self::ContainerPort | Self::ServicePort => NAME_KEY,
            _ => &[],
        }
    }

    /// Check if siblings of this kind are matched by key
    #[inline]
    #[must_use]
    pub fn is_keyed(self) -> bool {
        !self.key_fields().is_empty()
    }

    /// Kind stored in the named slot, `None` if the slot is unknown
    #[must_use]
    pub fn slot_kind(self, slot: &str) -> Option<NodeKind> {
        let kind = match (self, slot) {
            (Self::Resource, "metadata") | (Self::PodTemplate, "metadata") => Self::Metadata,
            (Self::Resource, "spec") => Self::Object,
            (Self::Metadata, "labels" | "annotations") => Self::Map,
            (Self::IngressRule, "http") => Self::HttpRuleValue,
            (Self::IngressPath, "backend") => Self::IngressBackend,
            (Self::IngressBackend, "service") => Self::ServiceBackend,
            (Self::ServiceBackend, "port") => Self::ServiceBackendPort,
            (Self::DeploymentSpec, "template") => Self::PodTemplate,
            (Self::DeploymentSpec | Self::ServiceSpec, "selector") => Self::Map,
            (Self::PodTemplate, "spec") => Self::PodSpec,
            (Self::Object, _) => Self::Object,
            _ => return None,
        };
        Some(kind)
    }

    /// Kind stored in the named collection, `None` if the collection is unknown
    #[must_use]
    pub fn collection_kind(self, collection: &str) -> Option<NodeKind> {
        let kind = match (self, collection) {
            (Self::List, "items") => Self::Resource,
            (Self::IngressSpec, "rules") => Self::IngressRule,
            (Self::HttpRuleValue, "paths") => Self::IngressPath,
            (Self::PodSpec, "containers") => Self::Container,
            (Self::Container, "env") => Self::EnvVar,
            (Self::Container, "ports") => Self::ContainerPort,
            (Self::ServiceSpec, "ports") => Self::ServicePort,
            (Self::Object, _) => Self::Object,
            _ => return None,
        };
        Some(kind)
    }

    /// Spec kind for a resource `kind` string
    #[must_use]
    pub fn spec_kind_for(resource_kind: &str) -> NodeKind {
        match resource_kind {
            "Ingress" => Self::IngressSpec,
            "Deployment" | "StatefulSet" => Self::DeploymentSpec,
            "Service" => Self::ServiceSpec,
            _ => Self::Object,
        }
    }

    /// Check if the kind accepts arbitrary scalar fields
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Map | Self::Object)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_kinds() {
        assert!(NodeKind::IngressRule.is_keyed());
        assert!(NodeKind::IngressPath.is_keyed());
        assert!(NodeKind::Resource.is_keyed());
        assert!(!NodeKind::HttpRuleValue.is_keyed());
        assert!(!NodeKind::ServiceBackend.is_keyed());
    }

    #[test]
    fn rule_host_is_optional() {
        let fields = NodeKind::IngressRule.key_fields();
        assert_eq!(fields.len(), 1);
        assert!(!fields[0].required);
        assert_eq!(fields[0].field(), "host");
    }

    #[test]
    fn path_key_is_path_and_type() {
        let names: Vec<_> = NodeKind::IngressPath
            .key_fields()
            .iter()
            .map(KeyField::field)
            .collect();
        assert_eq!(names, vec!["path", "pathType"]);
    }

    #[test]
    fn ingress_schema_chain() {
        assert_eq!(
            NodeKind::IngressSpec.collection_kind("rules"),
            Some(NodeKind::IngressRule)
        );
        assert_eq!(
            NodeKind::IngressRule.slot_kind("http"),
            Some(NodeKind::HttpRuleValue)
        );
        assert_eq!(
            NodeKind::HttpRuleValue.collection_kind("paths"),
            Some(NodeKind::IngressPath)
        );
        assert_eq!(
            NodeKind::IngressPath.slot_kind("backend"),
            Some(NodeKind::IngressBackend)
        );
        assert_eq!(NodeKind::IngressRule.collection_kind("paths"), None);
    }

    #[test]
    fn spec_kind_by_resource() {
        assert_eq!(NodeKind::spec_kind_for("Ingress"), NodeKind::IngressSpec);
        assert_eq!(NodeKind::spec_kind_for("Deployment"), NodeKind::DeploymentSpec);
        assert_eq!(NodeKind::spec_kind_for("ConfigMap"), NodeKind::Object);
    }

    #[test]
    fn object_is_open() {
        assert!(NodeKind::Object.is_open());
        assert_eq!(NodeKind::Object.slot_kind("anything"), Some(NodeKind::Object));
        assert!(!NodeKind::IngressRule.is_open());
    }
}
