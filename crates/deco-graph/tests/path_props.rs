//! Property tests for graph paths and semantic keys

use deco_graph::{GraphPath, Node, NodeKind, PathSegment, SemanticKey};
use proptest::prelude::*;

fn segment_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,7}"
}

/// Key parts full of separators the printer has to escape
fn key_part() -> impl Strategy<Value = String> {
    r"[a-z0-9/.,()\[\]\\ -]{0,8}"
}

fn segment() -> impl Strategy<Value = PathSegment> {
    prop_oneof![
        segment_name().prop_map(PathSegment::Name),
        (segment_name(), 0..64usize).prop_map(|(name, index)| PathSegment::Index(name, index)),
        (segment_name(), prop::collection::vec(key_part(), 1..4))
            .prop_map(|(name, parts)| PathSegment::Keyed(name, SemanticKey::new(parts))),
    ]
}

proptest! {
    #[test]
    fn prop_printed_path_parses_back(segments in prop::collection::vec(segment(), 0..5)) {
        let path = GraphPath::new(segments);
        let parsed: GraphPath = path.to_string().parse().unwrap();
        prop_assert_eq!(parsed, path);
    }

    #[test]
    fn prop_added_child_is_found_by_its_printed_key(
        value in r"[a-z/.,()\\]{1,10}",
        exact in any::<bool>()
    ) {
        let key = SemanticKey::new([value.as_str(), if exact { "Exact" } else { "Prefix" }]);
        let mut http = Node::new(NodeKind::HttpRuleValue);
        http.add_new("paths", &key).unwrap().commit().unwrap();

        let child = &http.children("paths")[0];
        prop_assert_eq!(child.key(), Some(key.clone()));

        let located: GraphPath = format!("paths{key}").parse().unwrap();
        prop_assert_eq!(located.resolve_node(&http), Some(child));
    }
}
