//! Decorator ordering
//!
//! Derives a dependency graph from the decorators' [`OrderingSpec`]s and
//! sorts it topologically. Decorators with no constraint between them keep
//! registration order, so the result is a pure function of the registered
//! list.

use crate::decorator::{Concept, Decorator, OrderingSpec};
use crate::error::{ConstraintReason, CycleEdge, OrderingError};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

/// Dependency graph over registration indices
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraphMap<usize, ConstraintReason>,
    labels: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph for decorators in registration order
    #[must_use]
    pub fn build(decorators: &[&dyn Decorator]) -> Self {
        let specs: Vec<OrderingSpec> = decorators.iter().map(|d| d.ordering()).collect();
        let ids: Vec<&'static str> = decorators.iter().map(|d| d.id()).collect();
        let labels = decorators
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}#{i}", d.describe()))
            .collect();

        let mut graph = DiGraphMap::new();
        for i in 0..decorators.len() {
            graph.add_node(i);
        }
        for (i, first) in specs.iter().enumerate() {
            for (j, second) in specs.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(reason) = constraint(first, ids[i], second, ids[j]) {
                    trace!(before = i, after = j, %reason, "ordering constraint");
                    graph.add_edge(i, j, reason);
                }
            }
        }

        Self { graph, labels }
    }

    /// Number of constraints
    #[inline]
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if `first` must run before `second`
    #[inline]
    #[must_use]
    pub fn constrains(&self, first: usize, second: usize) -> bool {
        self.graph.contains_edge(first, second)
    }

    /// Topological order, ties broken by earliest registration
    ///
    /// # Errors
    /// Returns [`OrderingError::Cycle`] naming every decorator of every cycle
    pub fn sort(&self) -> Result<Vec<usize>, OrderingError> {
        let count = self.labels.len();
        let mut in_degree: Vec<usize> = (0..count)
            .map(|i| self.graph.neighbors_directed(i, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(next)) = ready.pop() {
            order.push(next);
            for succ in self.graph.neighbors_directed(next, Direction::Outgoing) {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if order.len() < count {
            return Err(self.cycle_error());
        }
        debug!(decorators = count, constraints = self.constraint_count(), "ordered decorators");
        Ok(order)
    }

    fn cycle_error(&self) -> OrderingError {
        let mut participants = Vec::new();
        let mut edges = Vec::new();

        let mut components: Vec<Vec<usize>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect();
        components.sort();

        for scc in components {
            for &from in &scc {
                participants.push(self.labels[from].clone());
                for &to in &scc {
                    if let Some(reason) = self.graph.edge_weight(from, to) {
                        edges.push(CycleEdge {
                            before: self.labels[from].clone(),
                            after: self.labels[to].clone(),
                            reason: reason.clone(),
                        });
                    }
                }
            }
        }
        OrderingError::Cycle { participants, edges }
    }
}

/// Order decorators
///
/// Returns registration indices in application order.
///
/// # Errors
/// Returns [`OrderingError::Cycle`] if the constraints are cyclic
pub fn order(decorators: &[&dyn Decorator]) -> Result<Vec<usize>, OrderingError> {
    DependencyGraph::build(decorators).sort()
}

/// First reason `first` must run before `second`, if any
fn constraint(
    first: &OrderingSpec,
    first_id: &'static str,
    second: &OrderingSpec,
    second_id: &'static str,
) -> Option<ConstraintReason> {
    if let Some(c) = overlap(&first.removes, &second.requires) {
        return Some(ConstraintReason::RemovesRequired(c.to_string()));
    }
    if let Some(c) = overlap(&first.provides, &second.requires) {
        return Some(ConstraintReason::ProvidesRequired(c.to_string()));
    }
    if let Some(c) = overlap(&first.provides, &second.removes) {
        return Some(ConstraintReason::ProvidesRemoved(c.to_string()));
    }
    let explicit = second.after.contains(&first_id) || first.before.contains(&second_id);
    explicit.then_some(ConstraintReason::Explicit)
}

fn overlap<'a>(left: &'a [Concept], right: &[Concept]) -> Option<&'a Concept> {
    left.iter().find(|l| right.iter().any(|r| l.matches(r)))
}
