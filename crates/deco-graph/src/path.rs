//! Graph paths for addressing values inside the resource graph
//!
//! Provides [`GraphPath`] for locating a field or node by slot/collection
//! names, collection indices and semantic keys.

use crate::key::SemanticKey;
use crate::node::Node;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a [`GraphPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Field, slot or collection name
    Name(String),

    /// Collection child by position: `paths[0]`
    Index(String, usize),

    /// Collection child by semantic key: `rules(a.com)`
    Keyed(String, SemanticKey),
}

impl PathSegment {
    /// Name part of the segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Index(name, _) | Self::Keyed(name, _) => name,
        }
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(name, index) => write!(f, "{name}[{index}]"),
            Self::Keyed(name, key) => write!(f, "{name}{key}"),
        }
    }
}

/// Path within the resource graph
///
/// # Syntax
/// Segments are separated by `.`; a segment may select a collection child by
/// index (`paths[1]`) or by semantic key parts (`rules(a.com)`,
/// `paths(/v2,Prefix)`). Dots inside parentheses belong to the key. Inside
/// a key, `\` escapes the next character, so `\,`, `\(`, `\)`, `\[`,
/// `\]` and `\\` are literal.
///
/// # Examples
/// - `items(Deployment,web).spec.replicas`
/// - `spec.rules(a.com).http.paths[0].backend.service.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GraphPath(Vec<PathSegment>);

impl GraphPath {
    /// Create path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Empty path (the node itself)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, parent)| Self(parent.to_vec()))
    }

    /// First segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&PathSegment> {
        self.0.first()
    }

    /// Append a named segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Name(name.into()));
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Resolve the path against `node`
    ///
    /// The last segment may name a field (its value is returned) or a
    /// slot/collection (its manifest value is returned).
    #[must_use]
    pub fn resolve(&self, node: &Node) -> Option<Value> {
        let Some((last, steps)) = self.0.split_last() else {
            return Some(node.to_value());
        };

        let mut current = node;
        for step in steps {
            current = step_into(current, step)?;
        }

        match last {
            PathSegment::Name(name) => {
                if let Some(value) = current.field(name) {
                    return Some(value.clone());
                }
                if let Some(slot) = current.slot(name) {
                    return Some(slot.to_value());
                }
                current.has_collection(name).then(|| {
                    Value::Array(current.children(name).iter().map(Node::to_value).collect())
                })
            }
            selected => step_into(current, selected).map(Node::to_value),
        }
    }

    /// Resolve the path to a node
    #[must_use]
    pub fn resolve_node<'n>(&self, node: &'n Node) -> Option<&'n Node> {
        self.0
            .iter()
            .try_fold(node, |current, step| step_into(current, step))
    }
}

fn step_into<'n>(node: &'n Node, step: &PathSegment) -> Option<&'n Node> {
    match step {
        PathSegment::Name(name) => node.slot(name),
        PathSegment::Index(name, index) => node.children(name).get(*index),
        PathSegment::Keyed(name, key) => node.get(name, key),
    }
}

impl Display for GraphPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for GraphPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        split_segments(s)?
            .into_iter()
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Split on dots that are not inside `(...)` or `[...]`
fn split_segments(s: &str) -> Result<Vec<&str>, PathError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| PathError::Unbalanced(s.to_string()))?;
            }
            '.' if depth == 0 => {
                segments.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || escaped {
        return Err(PathError::Unbalanced(s.to_string()));
    }
    segments.push(&s[start..]);
    Ok(segments)
}

fn parse_segment(seg: &str) -> Result<PathSegment, PathError> {
    if seg.is_empty() {
        return Err(PathError::EmptySegment);
    }

    let (name, selector) = match seg.find(&['(', '['][..]) {
        Some(at) => (&seg[..at], Some(&seg[at..])),
        None => (seg, None),
    };

    if name.is_empty() || name.contains(|c: char| !c.is_alphanumeric() && c != '_' && c != '-') {
        return Err(PathError::InvalidSegment(seg.to_string()));
    }

    match selector {
        None => Ok(PathSegment::Name(name.to_string())),
        Some(sel) if sel.starts_with('[') && sel.ends_with(']') => {
            let index = sel[1..sel.len() - 1]
                .parse()
                .map_err(|_| PathError::InvalidSegment(seg.to_string()))?;
            Ok(PathSegment::Index(name.to_string(), index))
        }
        Some(sel) if sel.starts_with('(') && sel.ends_with(')') => {
            let key = parse_key(&sel[1..sel.len() - 1])
                .ok_or_else(|| PathError::InvalidSegment(seg.to_string()))?;
            Ok(PathSegment::Keyed(name.to_string(), key))
        }
        Some(_) => Err(PathError::InvalidSegment(seg.to_string())),
    }
}

/// Key parts split on unescaped commas
///
/// Returns `None` on a dangling `\` or an unescaped bracket.
fn parse_key(inner: &str) -> Option<SemanticKey> {
    let mut parts = Vec::new();
    let mut part = String::new();
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => part.push(chars.next()?),
            ',' => parts.push(std::mem::take(&mut part)),
            '(' | ')' | '[' | ']' => return None,
            _ => part.push(c),
        }
    }
    parts.push(part);
    Some(SemanticKey::new(parts))
}

/// Errors related to graph paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment syntax
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// Unbalanced brackets
    #[error("unbalanced brackets in path: {0}")]
    Unbalanced(String),
}
