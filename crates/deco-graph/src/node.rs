//! Graph nodes
//!
//! Provides [`Node`], the typed and mutable element of the resource graph,
//! and the keyed mutation surface decorators work against.

use crate::handle::ChildHandle;
use crate::key::SemanticKey;
use crate::kind::NodeKind;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Typed node of the resource graph
///
/// A node has scalar `fields`, single nested nodes in named `slots`, and
/// ordered child lists in named `collections`. Children of a keyed kind are
/// addressed by [`SemanticKey`], never by index.
///
/// # Invariants
/// - no two children of one collection share a semantic key
/// - slot and collection kinds follow [`NodeKind::slot_kind`] and
///   [`NodeKind::collection_kind`]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    fields: IndexMap<String, Value>,
    slots: IndexMap<String, Node>,
    collections: IndexMap<String, Vec<Node>>,
}

impl Node {
    /// Create empty node of `kind`
    #[inline]
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            fields: IndexMap::new(),
            slots: IndexMap::new(),
            collections: IndexMap::new(),
        }
    }

    /// Create a resource skeleton with metadata name and a typed spec
    #[must_use]
    pub fn resource(api_version: &str, kind: &str, name: &str) -> Self {
        let mut metadata = Node::new(NodeKind::Metadata);
        metadata.set_field("name", name);

        let mut resource = Node::new(NodeKind::Resource);
        resource.set_field("apiVersion", api_version);
        resource.set_field("kind", kind);
        resource.slots.insert("metadata".to_string(), metadata);
        resource
            .slots
            .insert("spec".to_string(), Node::new(NodeKind::spec_kind_for(kind)));
        resource
    }

    /// Kind tag
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Semantic key of this node (see [`SemanticKey::of`])
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<SemanticKey> {
        SemanticKey::of(self)
    }

    // ---------------------------------------------------------------------
    // Fields
    // ---------------------------------------------------------------------

    /// Get field value
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get string field
    #[inline]
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Check if field is set
    #[inline]
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set field, overwriting any previous value
    #[inline]
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Set field only if it is not set yet
    ///
    /// Returns `true` when the value was written.
    pub fn set_field_if_unset(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.fields.contains_key(name) {
            return false;
        }
        self.fields.insert(name.to_string(), value.into());
        true
    }

    /// Remove field
    #[inline]
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// Iterate fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field reached through slots: `["metadata", "name"]`
    #[must_use]
    pub fn path_field(&self, path: &[&str]) -> Option<&Value> {
        let (field, slots) = path.split_last()?;
        let mut node = self;
        for slot in slots {
            node = node.slots.get(*slot)?;
        }
        node.fields.get(*field)
    }

    /// Set a field reached through slots, creating missing slots
    ///
    /// # Errors
    /// Returns error if an intermediate slot is unknown for its parent kind
    pub fn set_path_field(&mut self, path: &[&str], value: impl Into<Value>) -> Result<(), GraphError> {
        let Some((field, slots)) = path.split_last() else {
            return Ok(());
        };
        let mut node = self;
        for slot in slots {
            node = node.ensure_slot(slot)?;
        }
        node.set_field(field, value);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Slots
    // ---------------------------------------------------------------------

    /// Get slot
    #[inline]
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Node> {
        self.slots.get(name)
    }

    /// Get mutable slot
    #[inline]
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.slots.get_mut(name)
    }

    /// Check if slot is present
    #[inline]
    #[must_use]
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Kind a slot of this node must hold
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownSlot`] if the schema has no such slot
    pub fn slot_kind(&self, name: &str) -> Result<NodeKind, GraphError> {
        if self.kind == NodeKind::Resource && name == "spec" {
            return Ok(NodeKind::spec_kind_for(self.str_field("kind").unwrap_or_default()));
        }
        self.kind.slot_kind(name).ok_or_else(|| GraphError::UnknownSlot {
            kind: self.kind,
            slot: name.to_string(),
        })
    }

    /// Get slot, creating an empty one of the schema kind if absent
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownSlot`] if the schema has no such slot
    pub fn ensure_slot(&mut self, name: &str) -> Result<&mut Node, GraphError> {
        let kind = self.slot_kind(name)?;
        Ok(self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| Node::new(kind)))
    }

    /// Put a node into a slot, returning the previous occupant
    ///
    /// # Errors
    /// Returns error if the slot is unknown or `node` has the wrong kind
    pub fn set_slot(&mut self, name: &str, node: Node) -> Result<Option<Node>, GraphError> {
        let expected = self.slot_kind(name)?;
        if expected != node.kind && !expected.is_open() {
            return Err(GraphError::KindMismatch {
                expected,
                found: node.kind,
            });
        }
        Ok(self.slots.insert(name.to_string(), node))
    }

    /// Remove slot
    #[inline]
    pub fn remove_slot(&mut self, name: &str) -> Option<Node> {
        self.slots.shift_remove(name)
    }

    // ---------------------------------------------------------------------
    // Keyed collections
    // ---------------------------------------------------------------------

    /// Kind of the children of a collection
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownCollection`] if the schema has no such collection
    pub fn collection_kind(&self, collection: &str) -> Result<NodeKind, GraphError> {
        self.kind
            .collection_kind(collection)
            .ok_or_else(|| GraphError::UnknownCollection {
                kind: self.kind,
                collection: collection.to_string(),
            })
    }

    /// Children of a collection (empty if absent)
    #[inline]
    #[must_use]
    pub fn children(&self, collection: &str) -> &[Node] {
        self.collections
            .get(collection)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Check if a collection exists (it may be empty)
    #[inline]
    #[must_use]
    pub fn has_collection(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    /// Create an empty collection if absent
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownCollection`] if the schema has no such collection
    pub fn ensure_collection(&mut self, collection: &str) -> Result<(), GraphError> {
        self.collection_kind(collection)?;
        self.collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    /// Check if a child with `key` exists
    #[inline]
    #[must_use]
    pub fn has(&self, collection: &str, key: &SemanticKey) -> bool {
        self.position(collection, key).is_some()
    }

    /// Get child by key
    #[inline]
    #[must_use]
    pub fn get(&self, collection: &str, key: &SemanticKey) -> Option<&Node> {
        self.children(collection).iter().find(|c| key.matches(c))
    }

    /// Index of child by key
    #[inline]
    #[must_use]
    pub fn position(&self, collection: &str, key: &SemanticKey) -> Option<usize> {
        self.children(collection).iter().position(|c| key.matches(c))
    }

    /// Start a new keyed child
    ///
    /// The key fields are seeded from `key`. The child becomes visible in the
    /// collection once the handle is committed or dropped.
    ///
    /// # Errors
    /// - [`GraphError::UnknownCollection`] for an unknown collection
    /// - [`GraphError::InvalidKey`] if `key` does not fit the child kind
    /// - [`GraphError::DuplicateKey`] if a child with `key` already exists
    pub fn add_new(&mut self, collection: &str, key: &SemanticKey) -> Result<ChildHandle<'_>, GraphError> {
        let kind = self.collection_kind(collection)?;
        if !key.is_valid_for(kind) {
            return Err(GraphError::InvalidKey {
                kind,
                key: key.to_string(),
            });
        }
        if self.has(collection, key) {
            return Err(GraphError::DuplicateKey {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }

        let mut child = Node::new(kind);
        for (field, part) in kind.key_fields().iter().zip(key.parts()) {
            if !part.is_empty() {
                child.set_path_field(field.path, part.as_str())?;
            }
        }

        let siblings = self.collections.entry(collection.to_string()).or_default();
        Ok(ChildHandle::new_child(collection, siblings, Some(key.clone()), child))
    }

    /// Start a new child of an unkeyed kind
    ///
    /// # Errors
    /// Returns error for an unknown collection or a keyed child kind
    pub fn append(&mut self, collection: &str) -> Result<ChildHandle<'_>, GraphError> {
        let kind = self.collection_kind(collection)?;
        if kind.is_keyed() {
            return Err(GraphError::InvalidKey {
                kind,
                key: "()".to_string(),
            });
        }
        let siblings = self.collections.entry(collection.to_string()).or_default();
        Ok(ChildHandle::new_child(collection, siblings, None, Node::new(kind)))
    }

    /// Edit an existing child by key
    ///
    /// The handle works on a copy that replaces the child on commit.
    ///
    /// # Errors
    /// Returns [`GraphError::NotFound`] if no child has `key`
    pub fn edit(&mut self, collection: &str, key: &SemanticKey) -> Result<ChildHandle<'_>, GraphError> {
        let not_found = || GraphError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        };
        let index = self.position(collection, key).ok_or_else(not_found)?;
        let siblings = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let working = siblings[index].clone();
        Ok(ChildHandle::existing_child(
            collection,
            siblings,
            index,
            Some(key.clone()),
            working,
        ))
    }

    /// Append a fully built child
    ///
    /// # Errors
    /// Returns error on unknown collection, wrong kind, or duplicate key
    pub fn push(&mut self, collection: &str, child: Node) -> Result<(), GraphError> {
        let kind = self.collection_kind(collection)?;
        if kind != child.kind && !kind.is_open() {
            return Err(GraphError::KindMismatch {
                expected: kind,
                found: child.kind,
            });
        }
        if let Some(key) = child.key() {
            if self.has(collection, &key) {
                return Err(GraphError::DuplicateKey {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(child);
        Ok(())
    }

    /// Remove child by key
    pub fn remove(&mut self, collection: &str, key: &SemanticKey) -> Option<Node> {
        let index = self.position(collection, key)?;
        self.collections
            .get_mut(collection)
            .map(|siblings| siblings.remove(index))
    }

    /// Mutable children of a collection
    pub fn children_mut(&mut self, collection: &str) -> impl Iterator<Item = &mut Node> {
        self.collections
            .get_mut(collection)
            .into_iter()
            .flat_map(|c| c.iter_mut())
    }

    /// Iterate slot entries
    pub fn slots(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate collection entries
    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Node])> {
        self.collections
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate mutable slot entries
    pub fn slots_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.slots.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate mutable collection entries
    ///
    /// Children are handed out as slices: membership only changes through
    /// the keyed API. Key fields can still be edited in place, so callers
    /// that do so must run [`Node::check_keys`] afterwards.
    pub fn collections_mut(&mut self) -> impl Iterator<Item = (&str, &mut [Node])> {
        self.collections
            .iter_mut()
            .map(|(k, v)| (k.as_str(), v.as_mut_slice()))
    }

    /// Check that no collection in this subtree has two children with one key
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateKey`] for the first clash found
    pub fn check_keys(&self) -> Result<(), GraphError> {
        for slot in self.slots.values() {
            slot.check_keys()?;
        }
        for (name, children) in &self.collections {
            let mut seen = HashSet::new();
            for child in children {
                if let Some(key) = child.key() {
                    if seen.contains(&key) {
                        return Err(GraphError::DuplicateKey {
                            collection: name.clone(),
                            key: key.to_string(),
                        });
                    }
                    seen.insert(key);
                }
                child.check_keys()?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    /// Manifest value of this node
    ///
    /// Fields come first, then slots, then collections, each in insertion
    /// order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        for (name, slot) in &self.slots {
            map.insert(name.clone(), slot.to_value());
        }
        for (name, children) in &self.collections {
            map.insert(
                name.clone(),
                Value::Array(children.iter().map(Node::to_value).collect()),
            );
        }
        Value::Object(map)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeKind::Object)
    }
}

/// Structural graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Slot not defined for kind
    #[error("{kind} has no slot '{slot}'")]
    UnknownSlot { kind: NodeKind, slot: String },

    /// Collection not defined for kind
    #[error("{kind} has no collection '{collection}'")]
    UnknownCollection { kind: NodeKind, collection: String },

    /// Child key already present
    #[error("duplicate key {key} in '{collection}'")]
    DuplicateKey { collection: String, key: String },

    /// Child key not present
    #[error("no child {key} in '{collection}'")]
    NotFound { collection: String, key: String },

    /// Key does not fit the child kind
    #[error("invalid key {key} for {kind}")]
    InvalidKey { kind: NodeKind, key: String },

    /// Key fields changed while a handle was open
    #[error("key in '{collection}' changed from {expected} to {found}")]
    KeyChanged {
        collection: String,
        expected: String,
        found: String,
    },

    /// Node kind does not fit its place
    #[error("expected {expected}, found {found}")]
    KindMismatch { expected: NodeKind, found: NodeKind },

    /// Export failed
    #[error("serialization failed: {0}")]
    Serialization(String),
}
