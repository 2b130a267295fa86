//! Decorator registry
//!
//! Provides [`DecoratorRegistry`], the ordered set of decorators of one
//! generation pass.

use crate::decorator::Decorator;
use crate::error::{DecorateError, OrderingError};
use crate::ordering::{self, DependencyGraph};
use crate::visitor::{self, ApplyReport};
use deco_config::ConfigReference;
use deco_graph::ResourceGraph;
use tracing::{debug, info};

/// Registered decorators in registration order
#[derive(Debug, Default)]
pub struct DecoratorRegistry {
    decorators: Vec<Box<dyn Decorator>>,
}

impl DecoratorRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            decorators: Vec::new(),
        }
    }

    /// Register a decorator
    pub fn register(&mut self, decorator: impl Decorator + 'static) {
        self.register_boxed(Box::new(decorator));
    }

    /// Register a boxed decorator
    pub fn register_boxed(&mut self, decorator: Box<dyn Decorator>) {
        debug!(decorator = %decorator.describe(), index = self.decorators.len(), "registered decorator");
        self.decorators.push(decorator);
    }

    /// Get number of registered decorators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Iterate in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Decorator> {
        self.decorators.iter().map(AsRef::as_ref)
    }

    /// Dependency graph of the registered decorators
    #[must_use]
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(&self.iter().collect::<Vec<_>>())
    }

    /// Decorators in application order
    ///
    /// # Errors
    /// Returns [`OrderingError::Cycle`] if the constraints are cyclic
    pub fn ordered(&self) -> Result<Vec<&dyn Decorator>, OrderingError> {
        let refs: Vec<&dyn Decorator> = self.iter().collect();
        let order = ordering::order(&refs)?;
        Ok(order.into_iter().map(|i| refs[i]).collect())
    }

    /// Config references of all decorators, in application order
    ///
    /// # Errors
    /// Returns [`OrderingError::Cycle`] if the constraints are cyclic
    pub fn config_references(&self) -> Result<Vec<ConfigReference>, OrderingError> {
        Ok(self
            .ordered()?
            .into_iter()
            .flat_map(|d| d.config_references())
            .collect())
    }

    /// Apply every decorator to `graph` in order
    ///
    /// Decorators run against a scratch copy; `graph` is only replaced when
    /// every decorator succeeded.
    ///
    /// # Errors
    /// Returns the first ordering or decorator error
    pub fn apply(&self, graph: &mut ResourceGraph) -> Result<ApplyReport, DecorateError> {
        let ordered = self.ordered()?;
        let mut scratch = graph.clone();
        let mut report = ApplyReport::default();

        for decorator in ordered {
            let applied = visitor::apply(decorator, &mut scratch)?;
            debug!(decorator = %decorator.describe(), visited = applied.visited, "applied decorator");
            report.absorb(applied);
        }

        *graph = scratch;
        info!(
            decorators = report.decorators,
            visited = report.visited,
            resources = graph.len(),
            "decoration complete"
        );
        Ok(report)
    }
}

impl Extend<Box<dyn Decorator>> for DecoratorRegistry {
    fn extend<I: IntoIterator<Item = Box<dyn Decorator>>>(&mut self, iter: I) {
        for decorator in iter {
            self.register_boxed(decorator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::{Concept, OrderingSpec, VisitContext};
    use deco_graph::{Node, NodeKind};

    #[derive(Debug)]
    struct SetField {
        id: &'static str,
        field: &'static str,
        value: i64,
        spec: OrderingSpec,
        fail: bool,
    }

    impl SetField {
        fn new(id: &'static str, field: &'static str, value: i64) -> Self {
            Self {
                id,
                field,
                value,
                spec: OrderingSpec::new(),
                fail: false,
            }
        }
    }

    impl Decorator for SetField {
        fn id(&self) -> &'static str {
            self.id
        }

        fn target(&self) -> NodeKind {
            NodeKind::DeploymentSpec
        }

        fn ordering(&self) -> OrderingSpec {
            self.spec.clone()
        }

        fn visit(&self, node: &mut Node, _context: &VisitContext) -> Result<(), DecorateError> {
            if self.fail {
                return Err(DecorateError::missing("test.value", "No value"));
            }
            node.set_field(self.field, self.value);
            Ok(())
        }
    }

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.ensure_resource("apps/v1", "Deployment", "web").unwrap();
        graph
    }

    fn replicas(graph: &ResourceGraph) -> Option<serde_json::Value> {
        graph.resolve(&"spec.replicas".parse().unwrap())
    }

    #[test]
    fn registry_new_empty() {
        let registry = DecoratorRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn apply_runs_in_dependency_order() {
        let mut registry = DecoratorRegistry::new();
        let mut late = SetField::new("late", "replicas", 2);
        late.spec = OrderingSpec::new().requires(Concept::new("replicas", "web"));
        let mut early = SetField::new("early", "replicas", 1);
        early.spec = OrderingSpec::new().provides(Concept::new("replicas", "web"));
        registry.register(late);
        registry.register(early);

        let mut graph = graph();
        let report = registry.apply(&mut graph).unwrap();
        assert_eq!(report.decorators, 2);
        assert_eq!(replicas(&graph), Some(serde_json::json!(2)));
    }

    #[test]
    fn failure_leaves_graph_untouched() {
        let mut registry = DecoratorRegistry::new();
        registry.register(SetField::new("first", "replicas", 4));
        let mut failing = SetField::new("second", "paused", 1);
        failing.fail = true;
        registry.register(failing);

        let mut graph = graph();
        let before = graph.clone();
        let err = registry.apply(&mut graph).unwrap_err();
        assert_eq!(err.remediation(), Some("test.value"));
        assert_eq!(graph, before);
    }

    #[test]
    fn cycle_aborts_before_any_mutation() {
        let mut registry = DecoratorRegistry::new();
        let mut a = SetField::new("a", "replicas", 1);
        a.spec = OrderingSpec::new().after("b");
        let mut b = SetField::new("b", "replicas", 2);
        b.spec = OrderingSpec::new().after("a");
        registry.register(a);
        registry.register(b);

        let mut graph = graph();
        let err = registry.apply(&mut graph).unwrap_err();
        assert!(matches!(err, DecorateError::Ordering(OrderingError::Cycle { .. })));
        assert_eq!(replicas(&graph), None);
    }

    #[test]
    fn dependency_graph_reflects_registrations() {
        let mut registry = DecoratorRegistry::new();
        let mut x = SetField::new("x", "replicas", 1);
        x.spec = OrderingSpec::new().before("y");
        registry.register(x);
        registry.register(SetField::new("y", "replicas", 1));
        assert_eq!(registry.dependency_graph().constraint_count(), 1);
    }

    #[test]
    fn extend_with_boxed() {
        let mut registry = DecoratorRegistry::new();
        registry.extend(vec![
            Box::new(SetField::new("a", "replicas", 1)) as Box<dyn Decorator>,
            Box::new(SetField::new("b", "replicas", 1)),
        ]);
        assert_eq!(registry.iter().map(Decorator::id).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
