//! Scoped child handles
//!
//! A [`ChildHandle`] adds or edits a keyed child with its key checked. It
//! works on a detached copy and reattaches it to the parent collection when
//! committed, or when dropped on any other exit path.
//!
//! Raw `&mut Node` access through [`Node::collections_mut`] or
//! [`Node::children_mut`] skips these checks. [`Node::check_keys`] finds the
//! duplicate keys such edits can leave behind.

use crate::key::SemanticKey;
use crate::node::{GraphError, Node};
use std::ops::{Deref, DerefMut};

/// Mutable handle to a new or existing child
///
/// # Guarantees
/// - siblings never observe a half-built child
/// - the semantic key the handle was opened with cannot silently change:
///   a changed or clashing key is rejected and the parent is left as it was
#[must_use = "a child handle reattaches on commit or drop"]
pub struct ChildHandle<'a> {
    collection: String,
    siblings: &'a mut Vec<Node>,
    index: Option<usize>,
    key: Option<SemanticKey>,
    node: Node,
    done: bool,
}

impl<'a> ChildHandle<'a> {
    pub(crate) fn new_child(
        collection: &str,
        siblings: &'a mut Vec<Node>,
        key: Option<SemanticKey>,
        node: Node,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            siblings,
            index: None,
            key,
            node,
            done: false,
        }
    }

    pub(crate) fn existing_child(
        collection: &str,
        siblings: &'a mut Vec<Node>,
        index: usize,
        key: Option<SemanticKey>,
        node: Node,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            siblings,
            index: Some(index),
            key,
            node,
            done: false,
        }
    }

    /// Key the handle was opened with
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&SemanticKey> {
        self.key.as_ref()
    }

    /// Check if the handle will append a new child
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.index.is_none()
    }

    /// Reattach the child to its parent
    ///
    /// # Errors
    /// - [`GraphError::KeyChanged`] if key fields were edited
    /// - [`GraphError::DuplicateKey`] if another sibling now has the same key
    pub fn commit(mut self) -> Result<(), GraphError> {
        self.done = true;
        self.reattach()
    }

    /// Drop the working copy and leave the parent as it was
    pub fn discard(mut self) {
        self.done = true;
    }

    fn reattach(&mut self) -> Result<(), GraphError> {
        let node = std::mem::take(&mut self.node);
        let found = node.key();
        if found != self.key {
            return Err(GraphError::KeyChanged {
                collection: self.collection.clone(),
                expected: describe(self.key.as_ref()),
                found: describe(found.as_ref()),
            });
        }

        if let Some(key) = &found {
            let clash = self
                .siblings
                .iter()
                .enumerate()
                .any(|(i, sibling)| Some(i) != self.index && key.matches(sibling));
            if clash {
                return Err(GraphError::DuplicateKey {
                    collection: self.collection.clone(),
                    key: key.to_string(),
                });
            }
        }

        match self.index {
            Some(index) => self.siblings[index] = node,
            None => self.siblings.push(node),
        }
        Ok(())
    }
}

fn describe(key: Option<&SemanticKey>) -> String {
    key.map_or_else(|| "()".to_string(), ToString::to_string)
}

impl Deref for ChildHandle<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl DerefMut for ChildHandle<'_> {
    fn deref_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl Drop for ChildHandle<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(err) = self.reattach() {
            tracing::warn!(%err, collection = %self.collection, "discarding uncommitted child mutation");
        }
    }
}

impl std::fmt::Debug for ChildHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildHandle")
            .field("collection", &self.collection)
            .field("index", &self.index)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
