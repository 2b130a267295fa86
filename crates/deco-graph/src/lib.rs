//! Deco Resource Graph
//!
//! Typed, keyed, in-memory manifest tree with scoped mutation handles.
//!
//! # Core Concepts
//!
//! - [`ResourceGraph`]: Root list of resources for one generation pass
//! - [`Node`]: Typed node with fields, slots and keyed collections
//! - [`NodeKind`]: Closed set of node kinds and their schema
//! - [`SemanticKey`]: Content-based identity of a node among its siblings
//! - [`ChildHandle`]: Scoped add/edit handle with guaranteed reattachment
//! - [`GraphPath`]: Addressing of values inside the graph
//! - [`Selector`]: Exact value or explicit wildcard
//!
//! # Example
//!
//! ```rust,ignore
//! use deco_graph::{ResourceGraph, ResourceRef, SemanticKey};
//!
//! let mut graph = ResourceGraph::new();
//! graph.ensure_resource("networking.k8s.io/v1", "Ingress", "web")?;
//!
//! let key = ResourceRef::new("Ingress", "web").key();
//! let mut ingress = graph.root_mut().edit("items", &key)?;
//! let spec = ingress.ensure_slot("spec")?;
//! spec.add_new("rules", &SemanticKey::single("a.com"))?.commit()?;
//! ingress.commit()?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod graph;
mod handle;
mod key;
mod kind;
mod node;
mod path;
mod selector;

// Re-exports
pub use graph::{resource_path, ResourceGraph, ResourceRef};
pub use handle::ChildHandle;
pub use key::SemanticKey;
pub use kind::{KeyField, NodeKind};
pub use node::{GraphError, Node};
pub use path::{GraphPath, PathError, PathSegment};
pub use selector::Selector;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_handles_build_ingress_chain() {
        let mut graph = ResourceGraph::new();
        graph
            .ensure_resource("networking.k8s.io/v1", "Ingress", "web")
            .unwrap();

        let key = ResourceRef::new("Ingress", "web").key();
        let mut ingress = graph.root_mut().edit("items", &key).unwrap();
        let spec = ingress.ensure_slot("spec").unwrap();
        let mut rule = spec.add_new("rules", &SemanticKey::single("a.com")).unwrap();
        let http = rule.ensure_slot("http").unwrap();
        let mut path = http
            .add_new("paths", &SemanticKey::new(["/", "Prefix"]))
            .unwrap();
        path.ensure_slot("backend")
            .unwrap()
            .ensure_slot("service")
            .unwrap()
            .set_field("name", "web");
        path.commit().unwrap();
        rule.commit().unwrap();
        ingress.commit().unwrap();

        let value = graph.resolve(&"spec".parse().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "rules": [{
                    "host": "a.com",
                    "http": {"paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {"service": {"name": "web"}}
                    }]}
                }]
            })
        );
    }

    #[test]
    fn keyed_children_never_duplicate() {
        let mut spec = Node::new(NodeKind::IngressSpec);
        let key = SemanticKey::single("a.com");
        spec.add_new("rules", &key).unwrap().commit().unwrap();
        assert!(spec.add_new("rules", &key).is_err());
        assert_eq!(spec.children("rules").len(), 1);
    }
}
