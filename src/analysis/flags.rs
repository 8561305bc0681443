use tracing::debug;

use crate::graph::{EdgeType, HeapSnapshot};
use crate::types::NodeOrdinal;

pub const DETACHED_DOM_TREES_NAME: &str = "(Detached DOM trees)";
pub const DETACHED_DOM_TREE_PREFIX: &str = "Detached DOM tree";

/// Bits of the per-node flags word.
pub struct NodeFlags;

impl NodeFlags {
    pub const CAN_BE_QUERIED: u32 = 1;
    pub const DETACHED_DOM_TREE_NODE: u32 = 2;
    /// Owned by the inspected page, as opposed to the debugger.
    pub const PAGE_OBJECT: u32 = 4;

    pub const VISITED_MARKER_MASK: u32 = 0x0ffff;
    /// Scratch bit for a single traversal; cleared again once a node is
    /// finalized.
    pub const VISITED_MARKER: u32 = 0x10000;
}

impl HeapSnapshot {
    pub fn flags(&self) -> &[u32] {
        &self.flags
    }

    /// Re-runs all flag passes from scratch.
    pub fn recompute_flags(&mut self) {
        self.flags = self.compute_flags();
    }

    pub(crate) fn compute_flags(&self) -> Vec<u32> {
        let mut flags = vec![0u32; self.node_count()];
        self.mark_detached_dom_tree_nodes(&mut flags);
        self.mark_queriable_heap_objects(&mut flags);
        self.mark_page_owned_nodes(&mut flags);
        flags
    }

    /// Tags the direct children of every "Detached DOM tree" group. Only one
    /// hop: descendants further down are left alone.
    fn mark_detached_dom_tree_nodes(&self, flags: &mut [u32]) {
        let detached_roots = self
            .root_node()
            .edges()
            .map(|e| e.node())
            .find(|n| n.name() == DETACHED_DOM_TREES_NAME);
        let Some(detached_roots) = detached_roots else {
            debug!("no {} node, skipping detached DOM marking", DETACHED_DOM_TREES_NAME);
            return;
        };

        for tree in detached_roots.edges().map(|e| e.node()) {
            if !tree.class_name().starts_with(DETACHED_DOM_TREE_PREFIX) {
                continue;
            }
            for edge in tree.edges() {
                flags[edge.node().ordinal() as usize] |= NodeFlags::DETACHED_DOM_TREE_NODE;
            }
        }
    }

    /// Marks everything reachable from a user root through edges that are
    /// neither hidden, invisible, internal nor weak. Only such objects can
    /// be inspected without touching half-initialized wrapper internals.
    fn mark_queriable_heap_objects(&self, flags: &mut [u32]) {
        let flag = NodeFlags::CAN_BE_QUERIED;
        let layout = &self.layout;
        let nfc = layout.node_field_count as u32;
        let efc = layout.edge_field_count;
        let edges = &self.containment_edges;

        let mut list: Vec<NodeOrdinal> = self
            .root_node()
            .edges()
            .map(|e| e.node())
            .filter(|n| n.is_user_root())
            .map(|n| n.ordinal())
            .collect();

        while let Some(ordinal) = list.pop() {
            if flags[ordinal as usize] & flag != 0 {
                continue;
            }
            flags[ordinal as usize] |= flag;

            let begin = self.first_edge_indexes[ordinal as usize] as usize;
            let end = self.first_edge_indexes[ordinal as usize + 1] as usize;
            for edge_index in (begin..end).step_by(efc) {
                let child = edges[edge_index + layout.edge_to_node_offset] / nfc;
                if flags[child as usize] & flag != 0 {
                    continue;
                }
                match layout.edge_type(edges[edge_index + layout.edge_type_offset]) {
                    EdgeType::Hidden | EdgeType::Invisible | EdgeType::Internal | EdgeType::Weak => {
                        continue;
                    }
                    _ => list.push(child),
                }
            }
        }
    }

    /// Marks everything reachable from the page's entry points (the root's
    /// shortcut edges and the document DOM trees root) without crossing a
    /// weak edge.
    fn mark_page_owned_nodes(&self, flags: &mut [u32]) {
        let flag = NodeFlags::PAGE_OBJECT;
        let visited_marker = NodeFlags::VISITED_MARKER;
        let marker_and_flag = visited_marker | flag;

        let layout = &self.layout;
        let nfc = layout.node_field_count as u32;
        let efc = layout.edge_field_count;
        let edges = &self.containment_edges;

        let mut nodes_to_visit = vec![0 as NodeOrdinal; self.node_count()];
        let mut nodes_to_visit_length = 0usize;

        for edge in self.root_node().edges() {
            let node = edge.node();
            match edge.typ() {
                EdgeType::Element if node.is_document_dom_trees_root() => {}
                EdgeType::Shortcut => {}
                _ => continue,
            }
            let ordinal = node.ordinal() as usize;
            if flags[ordinal] & visited_marker != 0 {
                continue;
            }
            nodes_to_visit[nodes_to_visit_length] = ordinal as NodeOrdinal;
            nodes_to_visit_length += 1;
            flags[ordinal] |= visited_marker;
        }

        while nodes_to_visit_length > 0 {
            nodes_to_visit_length -= 1;
            let ordinal = nodes_to_visit[nodes_to_visit_length] as usize;
            flags[ordinal] |= flag;
            flags[ordinal] &= NodeFlags::VISITED_MARKER_MASK;

            let begin = self.first_edge_indexes[ordinal] as usize;
            let end = self.first_edge_indexes[ordinal + 1] as usize;
            for edge_index in (begin..end).step_by(efc) {
                let child = (edges[edge_index + layout.edge_to_node_offset] / nfc) as usize;
                if flags[child] & marker_and_flag != 0 {
                    continue;
                }
                if layout.edge_type(edges[edge_index + layout.edge_type_offset]) == EdgeType::Weak {
                    continue;
                }
                nodes_to_visit[nodes_to_visit_length] = child as NodeOrdinal;
                nodes_to_visit_length += 1;
                flags[child] |= visited_marker;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeType};

    /// root -> U -> O -(weak)-> W, plus engine state under (GC roots).
    #[test]
    fn test_weak_edge_stops_both_passes() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let gc_roots = b.add_node(NodeType::Synthetic, "(GC roots)", 0);
        let engine = b.add_node(NodeType::Hidden, "system / Heap", 8);
        let u = b.add_node(NodeType::Object, "Window", 40);
        let o = b.add_node(NodeType::Object, "Object", 16);
        let w = b.add_node(NodeType::Object, "WeakTarget", 16);

        b.add_indexed_edge(root, EdgeType::Element, 1, gc_roots);
        b.add_edge(root, EdgeType::Shortcut, "1", u);
        b.add_indexed_edge(gc_roots, EdgeType::Element, 1, engine);
        b.add_edge(engine, EdgeType::Internal, "w", w);
        b.add_edge(u, EdgeType::Property, "o", o);
        b.add_edge(o, EdgeType::Weak, "w", w);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();
        let node = |o| snapshot.node_by_ordinal(o);

        assert!(node(u).can_be_queried());
        assert!(node(o).can_be_queried());
        assert!(!node(w).can_be_queried());
        assert!(!node(engine).can_be_queried());

        assert!(node(u).is_user_object());
        assert!(node(o).is_user_object());
        assert!(!node(w).is_user_object());
        assert!(!node(engine).is_user_object());
        assert!(!node(gc_roots).is_user_object());
    }

    #[test]
    fn test_queryable_skips_internal_and_hidden_edges() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let u = b.add_node(NodeType::Object, "Window", 40);
        let via_internal = b.add_node(NodeType::Object, "Wrapper", 16);
        let via_hidden = b.add_node(NodeType::Object, "Secret", 16);
        let via_context = b.add_node(NodeType::Object, "Context", 16);

        b.add_indexed_edge(root, EdgeType::Element, 1, u);
        b.add_edge(u, EdgeType::Internal, "wrapper", via_internal);
        b.add_indexed_edge(u, EdgeType::Hidden, 0, via_hidden);
        b.add_edge(u, EdgeType::Context, "ctx", via_context);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();
        let node = |o| snapshot.node_by_ordinal(o);

        assert!(node(u).can_be_queried());
        assert!(node(via_context).can_be_queried());
        assert!(!node(via_internal).can_be_queried());
        assert!(!node(via_hidden).can_be_queried());

        // Reached through an element edge only, so not a page entry point.
        assert!(!node(u).is_user_object());
    }

    #[test]
    fn test_document_dom_trees_root_seeds_page_objects() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let trees = b.add_node(NodeType::Synthetic, "(Document DOM trees)", 0);
        let other = b.add_node(NodeType::Synthetic, "(Internalized strings)", 0);
        let document = b.add_node(NodeType::Native, "HTMLDocument", 200);
        let interned = b.add_node(NodeType::String, "foo", 16);

        b.add_indexed_edge(root, EdgeType::Element, 1, trees);
        b.add_indexed_edge(root, EdgeType::Element, 2, other);
        b.add_indexed_edge(trees, EdgeType::Element, 1, document);
        b.add_indexed_edge(other, EdgeType::Element, 1, interned);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();
        let node = |o| snapshot.node_by_ordinal(o);

        assert!(node(trees).is_user_object());
        assert!(node(document).is_user_object());
        assert!(!node(other).is_user_object());
        assert!(!node(interned).is_user_object());
    }

    #[test]
    fn test_detached_marking_is_one_hop() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let detached = b.add_node(NodeType::Synthetic, "(Detached DOM trees)", 0);
        let tree = b.add_node(NodeType::Native, "Detached DOM tree / 3 entries", 0);
        let unrelated = b.add_node(NodeType::Native, "Attached DOM tree", 0);
        let d1 = b.add_node(NodeType::Native, "HTMLDivElement", 100);
        let d2 = b.add_node(NodeType::Native, "Text", 50);
        let grandchild = b.add_node(NodeType::Native, "HTMLSpanElement", 80);
        let elsewhere = b.add_node(NodeType::Native, "HTMLBodyElement", 80);

        b.add_indexed_edge(root, EdgeType::Element, 1, detached);
        b.add_indexed_edge(detached, EdgeType::Element, 1, tree);
        b.add_indexed_edge(detached, EdgeType::Element, 2, unrelated);
        b.add_indexed_edge(tree, EdgeType::Element, 1, d1);
        b.add_indexed_edge(tree, EdgeType::Element, 2, d2);
        b.add_indexed_edge(d1, EdgeType::Element, 1, grandchild);
        b.add_indexed_edge(unrelated, EdgeType::Element, 1, elsewhere);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

        let marked: Vec<NodeOrdinal> = snapshot
            .iter_nodes()
            .filter(|n| n.is_detached_dom_tree_node())
            .map(|n| n.ordinal())
            .collect();
        assert_eq!(marked, vec![d1, d2]);
        assert!(!snapshot.node_by_ordinal(grandchild).is_detached_dom_tree_node());
    }

    #[test]
    fn test_missing_structural_nodes_leave_flags_clear() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let gc_roots = b.add_node(NodeType::Synthetic, "(GC roots)", 0);
        b.add_indexed_edge(root, EdgeType::Element, 1, gc_roots);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

        assert!(snapshot.flags().iter().all(|&f| f == 0));
    }

    #[test]
    fn test_recompute_is_idempotent_and_clears_markers() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let u = b.add_node(NodeType::Object, "Window", 40);
        let a = b.add_node(NodeType::Object, "A", 8);
        let c = b.add_node(NodeType::Object, "C", 8);
        b.add_edge(root, EdgeType::Shortcut, "1", u);
        b.add_edge(u, EdgeType::Property, "a", a);
        b.add_edge(a, EdgeType::Property, "c", c);
        b.add_edge(c, EdgeType::Property, "a", a);
        b.add_edge(c, EdgeType::Property, "u", u);
        let mut snapshot = HeapSnapshot::new(b.finalize()).unwrap();

        let before = snapshot.flags().to_vec();
        snapshot.recompute_flags();
        assert_eq!(snapshot.flags(), &before[..]);
        assert!(before.iter().all(|&f| f & NodeFlags::VISITED_MARKER == 0));
        assert_eq!(
            before[a as usize],
            NodeFlags::CAN_BE_QUERIED | NodeFlags::PAGE_OBJECT
        );
    }
}
