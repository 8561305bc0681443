use super::edge::{Edge, RetainerEdge};
use super::node::Node;
use super::snapshot::HeapSnapshot;
use crate::types::{EdgeIndex, NodeIndex};

pub type EdgeFilter = Box<dyn Fn(&Edge<'_>) -> bool>;
pub type RetainerFilter = Box<dyn Fn(&RetainerEdge<'_>) -> bool>;
pub type NodeFilter = fn(&Node<'_>) -> bool;

/// What varies between kinds of snapshot: how cursors are made and which
/// edges and nodes a view should show. A `None` filter accepts everything.
pub trait SnapshotKind {
    fn create_node<'a>(&self, snapshot: &'a HeapSnapshot, node_index: NodeIndex) -> Node<'a> {
        snapshot.node(node_index)
    }

    fn create_edge<'a>(&self, snapshot: &'a HeapSnapshot, edge_index: EdgeIndex) -> Edge<'a> {
        snapshot.edge(edge_index)
    }

    fn create_retaining_edge<'a>(
        &self,
        snapshot: &'a HeapSnapshot,
        retained_node_index: NodeIndex,
        retainer_index: u32,
    ) -> RetainerEdge<'a> {
        assert!(
            (retainer_index as usize) < snapshot.retaining_edges.len(),
            "retainer index {retainer_index} out of range"
        );
        RetainerEdge::new(snapshot, retained_node_index, retainer_index)
    }

    fn containment_edges_filter(&self, show_hidden: bool) -> Option<EdgeFilter>;

    fn retaining_edges_filter(&self, show_hidden: bool) -> Option<RetainerFilter>;

    fn class_nodes_filter(&self) -> Option<NodeFilter>;
}

/// Graphs with no JavaScript-specific semantics: every edge and node is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericKind;

impl SnapshotKind for GenericKind {
    fn containment_edges_filter(&self, _show_hidden: bool) -> Option<EdgeFilter> {
        None
    }

    fn retaining_edges_filter(&self, _show_hidden: bool) -> Option<RetainerFilter> {
        None
    }

    fn class_nodes_filter(&self) -> Option<NodeFilter> {
        None
    }
}

/// V8 heap snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsKind;

impl SnapshotKind for JsKind {
    fn containment_edges_filter(&self, show_hidden: bool) -> Option<EdgeFilter> {
        Some(Box::new(move |edge| is_contained(edge, show_hidden)))
    }

    fn retaining_edges_filter(&self, show_hidden: bool) -> Option<RetainerFilter> {
        Some(Box::new(move |edge| is_retaining(edge, show_hidden)))
    }

    fn class_nodes_filter(&self) -> Option<NodeFilter> {
        Some(|node| node.is_user_object())
    }
}

/// Invisible edges never show; hidden edges and edges to hidden nodes only
/// when `show_hidden` is set.
pub fn is_contained(edge: &Edge<'_>, show_hidden: bool) -> bool {
    if edge.is_invisible() {
        return false;
    }
    if show_hidden {
        return true;
    }
    !edge.is_hidden() && !edge.node().is_hidden()
}

/// Like `is_contained`, seen from the retained side, and additionally
/// rejecting weak edges and retention by the synthetic root.
pub fn is_retaining(edge: &RetainerEdge<'_>, show_hidden: bool) -> bool {
    if edge.is_invisible() {
        return false;
    }
    let retainer = edge.node();
    if !show_hidden && (edge.is_hidden() || retainer.is_hidden()) {
        return false;
    }
    !retainer.is_root() && !edge.is_weak()
}

/// Outgoing edges of `node` that the kind's containment filter accepts.
pub fn containment_edges<'a, K: SnapshotKind + ?Sized>(
    kind: &K,
    node: Node<'a>,
    show_hidden: bool,
) -> Vec<Edge<'a>> {
    let snapshot = node.snapshot();
    let filter = kind.containment_edges_filter(show_hidden);
    node.edge_index_range()
        .step_by(snapshot.layout.edge_field_count)
        .map(|edge_index| kind.create_edge(snapshot, edge_index))
        .filter(|edge| filter.as_ref().is_none_or(|f| f(edge)))
        .collect()
}

/// Incoming edges of `node` that the kind's retaining filter accepts.
pub fn retaining_edges<'a, K: SnapshotKind + ?Sized>(
    kind: &K,
    node: Node<'a>,
    show_hidden: bool,
) -> Vec<RetainerEdge<'a>> {
    let snapshot = node.snapshot();
    let filter = kind.retaining_edges_filter(show_hidden);
    node.retainer_index_range()
        .map(|retainer_index| {
            kind.create_retaining_edge(snapshot, node.node_index(), retainer_index)
        })
        .filter(|edge| filter.as_ref().is_none_or(|f| f(edge)))
        .collect()
}
