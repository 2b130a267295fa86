//! Merge-by-key resolution
//!
//! A [`Patch`] describes the sub-tree a decorator wants to exist. Merging it
//! into the graph matches collection children by semantic key: a match is
//! merged recursively, anything else is appended. Re-applying the same patch
//! changes nothing.
//!
//! # Field modes
//! - [`FieldMode::Owned`]: the decorator owns the value and overwrites it
//! - [`FieldMode::Default`]: the value is only written when unset
//!
//! # Slot modes
//! - [`SlotMode::Merge`]: recurse into an existing slot
//! - [`SlotMode::Replace`]: the decorator owns the whole slot

use deco_graph::{GraphError, Node, NodeKind, SemanticKey};
use serde_json::Value;
use tracing::trace;

/// How a patch field is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Overwrite
    Owned,
    /// Write only if unset
    Default,
}

/// How a patch slot is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMode {
    /// Merge into the existing slot
    Merge,
    /// Replace the existing slot
    Replace,
}

/// Desired sub-tree of one node kind
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    kind: NodeKind,
    fields: Vec<(String, Value, FieldMode)>,
    slots: Vec<(String, Patch, SlotMode)>,
    collections: Vec<(String, Vec<Patch>)>,
}

impl Patch {
    /// Create empty patch
    #[inline]
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            slots: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Kind of the patched node
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Owned field
    #[inline]
    #[must_use]
    pub fn owned(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into(), FieldMode::Owned));
        self
    }

    /// Owned field, skipped when `value` is `None`
    #[inline]
    #[must_use]
    pub fn owned_opt<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.owned(name, value),
            None => self,
        }
    }

    /// Default field
    #[inline]
    #[must_use]
    pub fn default_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into(), FieldMode::Default));
        self
    }

    /// Slot merged into any existing one
    #[inline]
    #[must_use]
    pub fn slot(mut self, name: impl Into<String>, patch: Patch) -> Self {
        self.slots.push((name.into(), patch, SlotMode::Merge));
        self
    }

    /// Slot replacing any existing one
    #[inline]
    #[must_use]
    pub fn replace_slot(mut self, name: impl Into<String>, patch: Patch) -> Self {
        self.slots.push((name.into(), patch, SlotMode::Replace));
        self
    }

    /// Collection child
    #[must_use]
    pub fn child(mut self, collection: impl Into<String>, patch: Patch) -> Self {
        let collection = collection.into();
        match self.collections.iter_mut().find(|(name, _)| *name == collection) {
            Some((_, children)) => children.push(patch),
            None => self.collections.push((collection, vec![patch])),
        }
        self
    }

    /// Semantic key the patched node will have
    #[must_use]
    pub fn key(&self) -> Option<SemanticKey> {
        self.materialize().ok().and_then(|node| node.key())
    }

    /// Build a fresh node from the patch
    ///
    /// # Errors
    /// Returns error if the patch does not fit the node schema
    pub fn materialize(&self) -> Result<Node, GraphError> {
        let mut node = Node::new(self.kind);
        merge_node(&mut node, self, &mut MergeStats::default())?;
        Ok(node)
    }
}

/// Counts of one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Children and slots created
    pub created: usize,
    /// Existing children merged into
    pub merged: usize,
    /// Field values written
    pub updated: usize,
}

impl MergeStats {
    /// Check if the merge changed nothing
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }

    /// Add counts of another merge
    #[inline]
    pub fn absorb(&mut self, other: Self) {
        self.created += other.created;
        self.merged += other.merged;
        self.updated += other.updated;
    }
}

/// Merge `patch` into `node`
///
/// # Errors
/// Returns error if the patch kind differs from the node kind or does not
/// fit the schema
pub fn merge_node(node: &mut Node, patch: &Patch, stats: &mut MergeStats) -> Result<(), GraphError> {
    if node.kind() != patch.kind && !node.kind().is_open() {
        return Err(GraphError::KindMismatch {
            expected: node.kind(),
            found: patch.kind,
        });
    }

    for (name, value, mode) in &patch.fields {
        let written = match mode {
            FieldMode::Owned if node.field(name) != Some(value) => {
                node.set_field(name, value.clone());
                true
            }
            FieldMode::Owned => false,
            FieldMode::Default => node.set_field_if_unset(name, value.clone()),
        };
        if written {
            stats.updated += 1;
        }
    }

    for (name, sub, mode) in &patch.slots {
        if let Some(existing) = node.slot_mut(name) {
            match mode {
                SlotMode::Merge => merge_node(existing, sub, stats)?,
                SlotMode::Replace => {
                    let fresh = sub.materialize()?;
                    if *existing != fresh {
                        *existing = fresh;
                        stats.updated += 1;
                    }
                }
            }
        } else {
            node.set_slot(name, sub.materialize()?)?;
            stats.created += 1;
        }
    }

    for (collection, children) in &patch.collections {
        node.ensure_collection(collection)?;
        for child in children {
            merge_into(node, collection, child, stats)?;
        }
    }

    Ok(())
}

/// Merge `patch` as a child of `parent`'s `collection`
///
/// A child with the same semantic key is merged into; otherwise a new child
/// is added. Children of unkeyed kinds are always appended.
///
/// # Errors
/// Returns [`GraphError::InvalidKey`] if a keyed patch lacks a required key
/// field, or any schema error
pub fn merge_into(parent: &mut Node, collection: &str, patch: &Patch, stats: &mut MergeStats) -> Result<(), GraphError> {
    let kind = parent.collection_kind(collection)?;
    if !kind.is_keyed() {
        parent.push(collection, patch.materialize()?)?;
        stats.created += 1;
        return Ok(());
    }

    let key = patch.key().ok_or_else(|| GraphError::InvalidKey {
        kind,
        key: "()".to_string(),
    })?;

    if parent.has(collection, &key) {
        let mut child = parent.edit(collection, &key)?;
        merge_node(&mut child, patch, stats)?;
        child.commit()?;
        stats.merged += 1;
        trace!(collection, %key, "merged into existing child");
    } else {
        parent.push(collection, patch.materialize()?)?;
        stats.created += 1;
        trace!(collection, %key, "added child");
    }
    Ok(())
}
