use std::collections::VecDeque;
use std::io::Write;

use heap_snapshot_graph::{
    EdgeType, GenericKind, GraphBuilder, HeapSnapshot, JsKind, NodeOrdinal, NodeType,
    aggregate_by_class, containment_edges, load_snapshot, retaining_edges,
};
use tempfile::NamedTempFile;

const V8_SNAPSHOT: &str = r#"{
    "snapshot": {
        "meta": {
            "node_fields": ["type", "name", "id", "self_size", "edge_count", "trace_node_id"],
            "node_types": [["hidden", "array", "string", "object", "code", "closure", "regexp",
                            "number", "native", "synthetic", "concatenated string",
                            "sliced string", "symbol", "bigint", "object shape"],
                           "string", "number", "number", "number", "number"],
            "edge_fields": ["type", "name_or_index", "to_node"],
            "edge_types": [["context", "element", "property", "internal", "hidden",
                            "shortcut", "weak"],
                           "string_or_number", "node"]
        },
        "node_count": 5,
        "edge_count": 4,
        "trace_function_count": 0
    },
    "nodes": [9, 0, 1, 0, 2, 0,
              9, 1, 3, 0, 0, 0,
              3, 2, 5, 40, 1, 0,
              3, 3, 7, 24, 1, 0,
              3, 4, 9, 16, 0, 0],
    "edges": [1, 1, 6,
              5, 7, 12,
              2, 5, 18,
              6, 6, 24],
    "strings": ["", "(GC roots)", "Window", "Object", "WeakTarget", "o", "w", "window"]
}"#;

#[test]
fn test_load_snapshot_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(V8_SNAPSHOT.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let snapshot = load_snapshot(temp_file.path()).expect("Failed to load snapshot");
    assert_eq!(snapshot.node_count(), 5);
    assert_eq!(snapshot.edge_count(), 4);
    assert_eq!(snapshot.total_size(), 80);

    let window = snapshot.find_node_by_id(5).unwrap();
    let object = snapshot.find_node_by_id(7).unwrap();
    let weak_target = snapshot.find_node_by_id(9).unwrap();

    assert_eq!(window.name(), "Window");
    assert!(object.can_be_queried());
    assert!(object.is_user_object());
    assert!(!weak_target.can_be_queried());
    assert!(!weak_target.is_user_object());

    let user_roots = snapshot.user_roots();
    assert_eq!(user_roots, vec![window]);
}

#[test]
fn test_load_snapshot_rejects_inconsistent_edge_count() {
    let broken = V8_SNAPSHOT.replace("3, 4, 9, 16, 0, 0]", "3, 4, 9, 16, 1, 0]");
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(broken.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    assert!(load_snapshot(temp_file.path()).is_err());
}

/// Deterministic pseudo-random numbers, good enough for graph shapes.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as u32
    }
}

const NODE_TYPES: [NodeType; 9] = [
    NodeType::Object,
    NodeType::Object,
    NodeType::Hidden,
    NodeType::Synthetic,
    NodeType::String,
    NodeType::Native,
    NodeType::Code,
    NodeType::Closure,
    NodeType::Array,
];

const EDGE_TYPES: [EdgeType; 7] = [
    EdgeType::Context,
    EdgeType::Element,
    EdgeType::Property,
    EdgeType::Internal,
    EdgeType::Hidden,
    EdgeType::Shortcut,
    EdgeType::Weak,
];

fn add_random_edge(b: &mut GraphBuilder, rng: &mut Lcg, from: NodeOrdinal, typ: EdgeType, to: NodeOrdinal) {
    match typ {
        EdgeType::Element | EdgeType::Hidden => b.add_indexed_edge(from, typ, rng.next(8), to),
        _ => b.add_edge(from, typ, &format!("p{}", rng.next(6)), to),
    }
}

fn random_snapshot(seed: u64, node_count: u32) -> HeapSnapshot {
    let mut rng = Lcg(seed);
    let mut b = GraphBuilder::new();
    let root = b.add_node(NodeType::Synthetic, "", 0);
    let document_trees = b.add_node(NodeType::Synthetic, "(Document DOM trees)", 0);
    for i in 2..node_count {
        let typ = NODE_TYPES[rng.next(NODE_TYPES.len() as u32) as usize];
        let name = if rng.next(4) == 0 { "Array".to_string() } else { format!("C{}", i % 7) };
        b.add_node(typ, &name, 8 + rng.next(64));
    }

    b.add_indexed_edge(root, EdgeType::Element, 0, document_trees);
    for _ in 0..8 {
        let to = 2 + rng.next(node_count - 2);
        let typ = [EdgeType::Shortcut, EdgeType::Element, EdgeType::Property][rng.next(3) as usize];
        add_random_edge(&mut b, &mut rng, root, typ, to);
    }
    for from in 1..node_count {
        for _ in 0..rng.next(5) {
            let to = 1 + rng.next(node_count - 1);
            let typ = EDGE_TYPES[rng.next(EDGE_TYPES.len() as u32) as usize];
            add_random_edge(&mut b, &mut rng, from, typ, to);
        }
    }

    HeapSnapshot::new(b.finalize()).unwrap()
}

/// Plain BFS over the public node/edge views.
fn reference_reachable(
    snapshot: &HeapSnapshot,
    seeds: Vec<NodeOrdinal>,
    traverse: impl Fn(EdgeType) -> bool,
) -> Vec<bool> {
    let mut reached = vec![false; snapshot.node_count()];
    let mut queue: VecDeque<NodeOrdinal> = VecDeque::new();
    for seed in seeds {
        if !reached[seed as usize] {
            reached[seed as usize] = true;
            queue.push_back(seed);
        }
    }
    while let Some(ordinal) = queue.pop_front() {
        for edge in snapshot.node_by_ordinal(ordinal).edges() {
            let to = edge.node().ordinal();
            if traverse(edge.typ()) && !reached[to as usize] {
                reached[to as usize] = true;
                queue.push_back(to);
            }
        }
    }
    reached
}

#[test]
fn test_queryable_matches_reference_reachability() {
    for seed in [1, 7, 42, 1234] {
        let snapshot = random_snapshot(seed, 300);
        let seeds = snapshot
            .root_node()
            .edges()
            .map(|e| e.node())
            .filter(|n| n.is_user_root())
            .map(|n| n.ordinal())
            .collect();
        let expected = reference_reachable(&snapshot, seeds, |typ| {
            !matches!(
                typ,
                EdgeType::Hidden | EdgeType::Invisible | EdgeType::Internal | EdgeType::Weak
            )
        });

        for node in snapshot.iter_nodes() {
            assert_eq!(
                node.can_be_queried(),
                expected[node.ordinal() as usize],
                "seed {} node {:?}",
                seed,
                node
            );
        }
    }
}

#[test]
fn test_page_objects_match_reference_reachability() {
    for seed in [3, 9, 77, 4321] {
        let snapshot = random_snapshot(seed, 300);
        let seeds = snapshot
            .root_node()
            .edges()
            .filter(|e| {
                e.typ() == EdgeType::Shortcut
                    || (e.is_element() && e.node().is_document_dom_trees_root())
            })
            .map(|e| e.node().ordinal())
            .collect();
        let expected = reference_reachable(&snapshot, seeds, |typ| typ != EdgeType::Weak);

        for node in snapshot.iter_nodes() {
            assert_eq!(
                node.is_user_object(),
                expected[node.ordinal() as usize],
                "seed {} node {:?}",
                seed,
                node
            );
        }
    }
}

#[test]
fn test_recompute_flags_is_idempotent() {
    let mut snapshot = random_snapshot(99, 500);
    let before = snapshot.flags().to_vec();
    snapshot.recompute_flags();
    snapshot.recompute_flags();
    assert_eq!(snapshot.flags(), &before[..]);
}

#[test]
fn test_edge_slices_are_consistent() {
    let snapshot = random_snapshot(5, 400);
    let first_edge_indexes = snapshot.first_edge_indexes();
    let efc = snapshot.layout().edge_field_count as u32;

    assert_eq!(first_edge_indexes.len(), snapshot.node_count() + 1);
    for node in snapshot.iter_nodes() {
        let ordinal = node.ordinal() as usize;
        let begin = first_edge_indexes[ordinal];
        let end = first_edge_indexes[ordinal + 1];
        assert!(begin <= end);
        assert_eq!((end - begin) / efc, node.edge_count());
        assert_eq!(node.edges().len(), node.edge_count() as usize);
    }

    // Every edge shows up exactly once as a retainer of its target.
    let retainer_total: usize = snapshot.iter_nodes().map(|n| n.retainers_count() as usize).sum();
    assert_eq!(retainer_total, snapshot.edge_count());
    for node in snapshot.iter_nodes() {
        for retainer in node.retainers() {
            assert_eq!(retainer.edge().node(), node);
            assert!(retainer.node().edges().any(|e| e.edge_index() == retainer.edge().edge_index()));
        }
    }
}

#[test]
fn test_statistics_conservation() {
    for seed in [11, 12, 13] {
        let snapshot = random_snapshot(seed, 300);
        let stats = snapshot.statistics();
        let sum: u64 = snapshot.iter_nodes().map(|n| n.self_size() as u64).sum();

        assert_eq!(stats.total, sum);
        assert_eq!(stats.total, stats.v8heap + stats.native);
        assert!(stats.v8heap >= stats.code + stats.strings);
    }
}

#[test]
fn test_shared_backing_store_counted_at_most_once() {
    let mut b = GraphBuilder::new();
    let root = b.add_node(NodeType::Synthetic, "", 0);
    let first = b.add_node(NodeType::Object, "Array", 16);
    let second = b.add_node(NodeType::Object, "Array", 16);
    let store = b.add_node(NodeType::Array, "", 1000);
    b.add_edge(root, EdgeType::Shortcut, "a", first);
    b.add_edge(root, EdgeType::Shortcut, "b", second);
    b.add_edge(first, EdgeType::Internal, "elements", store);
    b.add_edge(second, EdgeType::Internal, "elements", store);
    let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

    assert!(snapshot.statistics().js_arrays <= 16 + 16 + 1000);
    assert_eq!(snapshot.statistics().js_arrays, 32);
}

#[test]
fn test_cons_string_names() {
    let mut b = GraphBuilder::new();
    b.add_node(NodeType::Synthetic, "", 0);
    let ab = b.add_node(NodeType::String, "ab", 16);
    let cd = b.add_node(NodeType::String, "cd", 16);
    let cons = b.add_node(NodeType::ConcatString, "", 32);
    b.add_edge(cons, EdgeType::Internal, "first", ab);
    b.add_edge(cons, EdgeType::Internal, "second", cd);

    let big = b.add_node(NodeType::String, &"z".repeat(1000), 1016);
    let long = b.add_node(NodeType::ConcatString, "", 32);
    b.add_edge(long, EdgeType::Internal, "first", big);
    b.add_edge(long, EdgeType::Internal, "second", big);
    let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

    assert_eq!(snapshot.node_by_ordinal(cons).name(), "abcd");
    assert_eq!(snapshot.node_by_ordinal(long).name().len(), 1024);
}

#[test]
fn test_detached_marking_scope() {
    let mut b = GraphBuilder::new();
    let root = b.add_node(NodeType::Synthetic, "", 0);
    let detached = b.add_node(NodeType::Synthetic, "(Detached DOM trees)", 0);
    let tree = b.add_node(NodeType::Native, "Detached DOM tree #1", 0);
    let d1 = b.add_node(NodeType::Native, "HTMLDivElement", 64);
    let d2 = b.add_node(NodeType::Native, "HTMLDivElement", 64);
    let grandchild = b.add_node(NodeType::Native, "Text", 32);
    b.add_indexed_edge(root, EdgeType::Element, 1, detached);
    b.add_indexed_edge(detached, EdgeType::Element, 1, tree);
    b.add_indexed_edge(tree, EdgeType::Element, 1, d1);
    b.add_indexed_edge(tree, EdgeType::Element, 2, d2);
    b.add_indexed_edge(d1, EdgeType::Element, 1, grandchild);
    let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

    for node in snapshot.iter_nodes() {
        let expected = node.ordinal() == d1 || node.ordinal() == d2;
        assert_eq!(node.is_detached_dom_tree_node(), expected, "{:?}", node);
    }
    let serialized = snapshot.node_by_ordinal(d1).serialize();
    assert!(serialized.detached_dom_tree_node);
}

#[test]
fn test_kinds_differ_in_filtering() {
    let mut b = GraphBuilder::new();
    let root = b.add_node(NodeType::Synthetic, "", 0);
    let window = b.add_node(NodeType::Object, "Window", 40);
    let cell = b.add_node(NodeType::Hidden, "system / PropertyCell", 16);
    let value = b.add_node(NodeType::Object, "Config", 24);
    b.add_edge(root, EdgeType::Shortcut, "window", window);
    b.add_edge(window, EdgeType::Shortcut, "config", value);
    b.add_edge(window, EdgeType::Property, "config", cell);
    b.add_edge(window, EdgeType::Weak, "cache", value);
    let snapshot = HeapSnapshot::new(b.finalize()).unwrap();
    let window = snapshot.node_by_ordinal(window);

    // The property edge to the hidden cell duplicates the shortcut.
    assert_eq!(containment_edges(&GenericKind, window, false).len(), 3);
    let visible: Vec<String> = containment_edges(&JsKind, window, true)
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(visible, vec![".config", "[[cache]]"]);

    let value = snapshot.node_by_ordinal(value);
    assert_eq!(retaining_edges(&GenericKind, value, false).len(), 2);
    assert_eq!(retaining_edges(&JsKind, value, false).len(), 1);

    let classes = aggregate_by_class(&snapshot, &JsKind);
    assert!(classes.iter().any(|c| c.name == "Config"));
    assert!(classes.iter().all(|c| c.name != "(synthetic)"));
}
