//! Decorator dispatch
//!
//! Walks the resource graph depth-first and hands every node of the
//! decorator's target kind to [`Decorator::visit`]. The walk does not descend
//! into a node it just visited.
//!
//! Keyed targets are visited through a [`ChildHandle`](deco_graph::ChildHandle),
//! so a visit that changes a node's key or clashes with a sibling fails with
//! [`DecorateError::Graph`]. Every visited subtree must keep its keys unique.

use crate::decorator::{Decorator, VisitContext};
use crate::error::DecorateError;
use deco_graph::{Node, NodeKind, PathSegment, ResourceGraph, ResourceRef, SemanticKey};
use tracing::{debug, trace};

/// Outcome of applying decorators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Decorators applied
    pub decorators: usize,
    /// Nodes handed to a decorator
    pub visited: usize,
    /// Decorators that found no target
    pub idle: usize,
}

impl ApplyReport {
    /// Add counts of another report
    #[inline]
    pub fn absorb(&mut self, other: Self) {
        self.decorators += other.decorators;
        self.visited += other.visited;
        self.idle += other.idle;
    }
}

/// Apply one decorator to every matching node of `graph`
///
/// # Errors
/// - [`DecorateError::Ambiguous`] if the decorator needs a unique target
///   resource and selects several
/// - [`DecorateError::Graph`] if a visit changes a keyed target's key or
///   leaves two siblings with one key
/// - any error of the decorator itself
pub fn apply(decorator: &dyn Decorator, graph: &mut ResourceGraph) -> Result<ApplyReport, DecorateError> {
    let mut report = ApplyReport {
        decorators: 1,
        ..ApplyReport::default()
    };

    if decorator.target() == NodeKind::List {
        decorator.visit(graph.root_mut(), &VisitContext::root())?;
        graph.root().check_keys()?;
        report.visited = 1;
        return Ok(report);
    }

    if let Some(property) = decorator.unique_target_property() {
        let candidates: Vec<String> = graph
            .resources()
            .iter()
            .filter_map(ResourceRef::of)
            .filter(|r| decorator.selects(r))
            .map(|r| r.to_string())
            .collect();
        if candidates.len() > 1 {
            return Err(DecorateError::Ambiguous {
                decorator: decorator.describe(),
                candidates,
                property: property.to_string(),
            });
        }
    }

    let selected: Vec<(String, usize, ResourceRef)> = graph
        .root()
        .collections()
        .flat_map(|(collection, resources)| {
            resources.iter().enumerate().filter_map(move |(index, resource)| {
                ResourceRef::of(resource).map(|reference| (collection.to_string(), index, reference))
            })
        })
        .filter(|(_, _, reference)| decorator.selects(reference))
        .collect();

    let mut context = VisitContext::root();
    for (collection, index, reference) in selected {
        context.push(PathSegment::Keyed(collection.clone(), reference.key()));
        context.set_resource(Some(reference));
        let visited = walk_child(graph.root_mut(), &collection, index, decorator, &mut context);
        context.set_resource(None);
        context.pop();
        report.visited += visited?;
    }

    if report.visited == 0 {
        report.idle = 1;
        debug!(decorator = %decorator.describe(), "decorator found no target");
    }
    Ok(report)
}

fn walk(node: &mut Node, decorator: &dyn Decorator, context: &mut VisitContext) -> Result<usize, DecorateError> {
    if node.kind() == decorator.target() {
        trace!(decorator = decorator.id(), path = %context.path(), "visiting node");
        decorator.visit(node, context)?;
        node.check_keys()?;
        return Ok(1);
    }

    let mut visited = 0;
    for (name, slot) in node.slots_mut() {
        context.push(PathSegment::Name(name.to_string()));
        let result = walk(slot, decorator, context);
        context.pop();
        visited += result?;
    }

    let layout: Vec<(String, Vec<Option<SemanticKey>>)> = node
        .collections()
        .map(|(name, children)| (name.to_string(), children.iter().map(Node::key).collect()))
        .collect();
    for (name, keys) in layout {
        for (index, key) in keys.into_iter().enumerate() {
            let segment = match key {
                Some(key) => PathSegment::Keyed(name.clone(), key),
                None => PathSegment::Index(name.clone(), index),
            };
            context.push(segment);
            let result = walk_child(node, &name, index, decorator, context);
            context.pop();
            visited += result?;
        }
    }
    Ok(visited)
}

/// Walk the child at `index` of `collection`
///
/// A keyed child of the target kind is visited on an edit handle that is
/// only committed when the visit succeeds and its subtree keys stay unique.
fn walk_child(
    parent: &mut Node,
    collection: &str,
    index: usize,
    decorator: &dyn Decorator,
    context: &mut VisitContext,
) -> Result<usize, DecorateError> {
    let key = match parent.children(collection).get(index) {
        Some(child) if child.kind() == decorator.target() => child.key(),
        Some(_) => None,
        None => return Ok(0),
    };

    let Some(key) = key else {
        return match parent.children_mut(collection).nth(index) {
            Some(child) => walk(child, decorator, context),
            None => Ok(0),
        };
    };

    trace!(decorator = decorator.id(), path = %context.path(), "visiting keyed node");
    let mut handle = parent.edit(collection, &key)?;
    let outcome = decorator
        .visit(&mut handle, context)
        .and_then(|()| handle.check_keys().map_err(DecorateError::from));
    match outcome {
        Ok(()) => {
            handle.commit()?;
            Ok(1)
        }
        Err(err) => {
            handle.discard();
            Err(err)
        }
    }
}
