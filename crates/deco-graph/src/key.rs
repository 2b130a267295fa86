//! Semantic keys
//!
//! A [`SemanticKey`] identifies a node among its siblings by content
//! (host, path and path type, name) instead of by position.

use crate::kind::NodeKind;
use crate::node::Node;
use serde_json::Value;
use std::fmt::{self, Display, Formatter, Write};

/// Ordered key parts of a keyed node
///
/// Parts follow [`NodeKind::key_fields`]. Optional parts that are absent are
/// stored as the empty string, so the host-less ingress rule still has a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticKey(Vec<String>);

impl SemanticKey {
    /// Create key from parts
    #[inline]
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Single-part key
    #[inline]
    #[must_use]
    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    /// Key parts
    #[inline]
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Compute the key of a node
    ///
    /// Returns `None` for kinds without key fields and when a required key
    /// field is absent or empty: such nodes never match anything.
    #[must_use]
    pub fn of(node: &Node) -> Option<Self> {
        let fields = node.kind().key_fields();
        if fields.is_empty() {
            return None;
        }

        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            let part = node
                .path_field(field.path)
                .and_then(scalar_to_string)
                .unwrap_or_default();
            if part.is_empty() && field.required {
                return None;
            }
            parts.push(part);
        }
        Some(Self(parts))
    }

    /// Check that a key is usable for `kind`
    ///
    /// The part count must match and no required part may be empty.
    #[must_use]
    pub fn is_valid_for(&self, kind: NodeKind) -> bool {
        let fields = kind.key_fields();
        fields.len() == self.0.len()
            && fields
                .iter()
                .zip(&self.0)
                .all(|(field, part)| !(field.required && part.is_empty()))
    }

    /// Check if a node carries this key
    #[inline]
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        Self::of(node).is_some_and(|key| key == *self)
    }
}

/// Characters escaped with `\\` when a key is printed
pub(crate) const KEY_ESCAPED: [char; 6] = ['\\', ',', '(', ')', '[', ']'];

// `(part,part)`, parsed back by `GraphPath`
impl Display for SemanticKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            for c in part.chars() {
                if KEY_ESCAPED.contains(&c) {
                    f.write_char('\\')?;
                }
                f.write_char(c)?;
            }
        }
        f.write_char(')')
    }
}

/// String form of a scalar used in keys
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
