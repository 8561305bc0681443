use std::cell::RefCell;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, info};

use super::edge::Edge;
use super::layout::{EdgeType, SnapshotLayout};
use super::node::Node;
use crate::analysis::statistics::Statistics;
use crate::parser::{RawSnapshot, StringTable};
use crate::types::{EdgeIndex, NodeIndex, NodeOrdinal, SnapshotError, SnapshotObjectId};

/// The immutable heap graph.
///
/// Nodes and edges stay in the producer's flat record layout. Each node's
/// outgoing edges are one contiguous slice of `containment_edges`, located
/// through `first_edge_indexes` (length `node_count + 1`). Incoming edges are
/// indexed the same way through `first_retainer_index`.
pub struct HeapSnapshot {
    pub(crate) layout: SnapshotLayout,
    pub(crate) nodes: Vec<u32>,
    pub(crate) containment_edges: Vec<u32>,
    pub(crate) strings: StringTable,

    pub(crate) first_edge_indexes: Vec<EdgeIndex>,
    pub(crate) first_retainer_index: Vec<u32>,
    pub(crate) retaining_nodes: Vec<NodeIndex>,
    pub(crate) retaining_edges: Vec<EdgeIndex>,

    /// One word of `NodeFlags` bits per node ordinal.
    pub(crate) flags: Vec<u32>,
    /// Resolved cons-string names, keyed by node index.
    pub(crate) lazy_string_cache: RefCell<AHashMap<NodeIndex, String>>,

    node_count: usize,
    root_node_index: NodeIndex,
    total_size: u64,
    statistics: Statistics,
}

impl HeapSnapshot {
    pub fn new(raw: RawSnapshot) -> Result<Self, SnapshotError> {
        let layout = SnapshotLayout::from_meta(&raw.meta)?;
        validate_buffer(&layout, &raw)?;

        let node_count = raw.nodes.len() / layout.node_field_count;
        let first_edge_indexes = build_edge_indexes(&layout, &raw.nodes);

        let mut snapshot = HeapSnapshot {
            layout,
            nodes: raw.nodes,
            containment_edges: raw.edges,
            strings: StringTable::new(raw.strings),
            first_edge_indexes,
            first_retainer_index: Vec::new(),
            retaining_nodes: Vec::new(),
            retaining_edges: Vec::new(),
            flags: vec![0; node_count],
            lazy_string_cache: RefCell::new(AHashMap::new()),
            node_count,
            root_node_index: raw.root_index,
            total_size: 0,
            statistics: Statistics::default(),
        };

        snapshot.build_retainers();
        snapshot.total_size = snapshot.iter_nodes().map(|n| n.self_size() as u64).sum();
        snapshot.mark_invisible_edges();
        snapshot.flags = snapshot.compute_flags();
        snapshot.statistics = snapshot.calculate_statistics();

        info!(
            nodes = snapshot.node_count,
            edges = snapshot.edge_count(),
            total_size = snapshot.total_size,
            "heap snapshot ready"
        );

        Ok(snapshot)
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.containment_edges.len() / self.layout.edge_field_count
    }

    /// Sum of every node's self size.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn first_edge_indexes(&self) -> &[EdgeIndex] {
        &self.first_edge_indexes
    }

    pub fn root_node_index(&self) -> NodeIndex {
        self.root_node_index
    }

    pub fn root_node(&self) -> Node<'_> {
        self.node(self.root_node_index)
    }

    pub fn node(&self, node_index: NodeIndex) -> Node<'_> {
        assert!(
            (node_index as usize) < self.nodes.len(),
            "node index {node_index} out of range"
        );
        Node::new(self, node_index)
    }

    pub fn node_by_ordinal(&self, ordinal: NodeOrdinal) -> Node<'_> {
        self.node(ordinal * self.layout.node_field_count as u32)
    }

    pub fn edge(&self, edge_index: EdgeIndex) -> Edge<'_> {
        assert!(
            (edge_index as usize) < self.containment_edges.len(),
            "edge index {edge_index} out of range"
        );
        Edge::new(self, edge_index)
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = Node<'_>> {
        let stride = self.layout.node_field_count;
        (0..self.nodes.len())
            .step_by(stride)
            .map(move |i| Node::new(self, i as NodeIndex))
    }

    pub fn find_node_by_id(&self, id: SnapshotObjectId) -> Option<Node<'_>> {
        self.iter_nodes().find(|n| n.id() == id)
    }

    pub(crate) fn flags_of(&self, ordinal: NodeOrdinal) -> u32 {
        self.flags[ordinal as usize]
    }

    pub fn mem_size(&self) -> usize {
        let mut ret = 0;
        ret += self.nodes.len() * size_of::<u32>();
        ret += self.containment_edges.len() * size_of::<u32>();
        ret += self.first_edge_indexes.len() * size_of::<EdgeIndex>();
        ret += self.first_retainer_index.len() * size_of::<u32>();
        ret += self.retaining_nodes.len() * size_of::<NodeIndex>();
        ret += self.retaining_edges.len() * size_of::<EdgeIndex>();
        ret += self.flags.len() * size_of::<u32>();
        ret
    }

    fn build_retainers(&mut self) {
        let nfc = self.layout.node_field_count;
        let efc = self.layout.edge_field_count;
        let to_node_offset = self.layout.edge_to_node_offset;

        let mut first_retainer_index = vec![0u32; self.node_count + 1];
        for to_node in self
            .containment_edges
            .iter()
            .skip(to_node_offset)
            .step_by(efc)
        {
            first_retainer_index[*to_node as usize / nfc] += 1;
        }

        // Counts become start offsets.
        let mut first_unused = 0u32;
        for slot in first_retainer_index.iter_mut() {
            let count = *slot;
            *slot = first_unused;
            first_unused += count;
        }

        let retainer_count = first_unused as usize;
        let mut retaining_nodes = vec![0; retainer_count];
        let mut retaining_edges = vec![0; retainer_count];
        let mut next_free = first_retainer_index.clone();

        for ordinal in 0..self.node_count {
            let node_index = (ordinal * nfc) as NodeIndex;
            let begin = self.first_edge_indexes[ordinal] as usize;
            let end = self.first_edge_indexes[ordinal + 1] as usize;
            for edge_index in (begin..end).step_by(efc) {
                let to_ordinal = self.containment_edges[edge_index + to_node_offset] as usize / nfc;
                let slot = next_free[to_ordinal] as usize;
                retaining_nodes[slot] = node_index;
                retaining_edges[slot] = edge_index as EdgeIndex;
                next_free[to_ordinal] += 1;
            }
        }

        self.first_retainer_index = first_retainer_index;
        self.retaining_nodes = retaining_nodes;
        self.retaining_edges = retaining_edges;
    }

    /// Global objects reach their properties both through shortcut edges and
    /// through regular edges to hidden property cells. The regular copies
    /// become invisible so each property shows up once.
    fn mark_invisible_edges(&mut self) {
        let mut to_hide: Vec<EdgeIndex> = Vec::new();

        for edge in self.root_node().edges() {
            if !edge.is_shortcut() {
                continue;
            }
            let global = edge.node();
            // Compared by string table index, so numeric names count too.
            let prop_names: AHashSet<u32> = global
                .edges()
                .filter(|e| e.is_shortcut())
                .map(|e| e.raw_name_or_index())
                .collect();

            for inner in global.edges() {
                if inner.is_shortcut() || !inner.stores_string_name() || !inner.node().is_hidden() {
                    continue;
                }
                if prop_names.contains(&inner.raw_name_or_index()) {
                    to_hide.push(inner.edge_index());
                }
            }
        }

        debug!(count = to_hide.len(), "marking edges invisible");
        let type_offset = self.layout.edge_type_offset;
        let invisible = self.layout.invisible_edge_type;
        for edge_index in to_hide {
            self.containment_edges[edge_index as usize + type_offset] = invisible;
        }
    }
}

fn validate_buffer(layout: &SnapshotLayout, raw: &RawSnapshot) -> Result<(), SnapshotError> {
    let nfc = layout.node_field_count;
    let efc = layout.edge_field_count;

    if raw.nodes.is_empty() || raw.nodes.len() % nfc != 0 {
        return Err(SnapshotError::InvalidFormat(format!(
            "nodes array length {} is not a positive multiple of {}",
            raw.nodes.len(),
            nfc
        )));
    }
    if raw.edges.len() % efc != 0 {
        return Err(SnapshotError::InvalidFormat(format!(
            "edges array length {} is not a multiple of {}",
            raw.edges.len(),
            efc
        )));
    }
    let root = raw.root_index as usize;
    if root >= raw.nodes.len() || root % nfc != 0 {
        return Err(SnapshotError::InvalidFormat(format!(
            "root index {} does not address a node",
            raw.root_index
        )));
    }

    let declared_edges: u64 = raw
        .nodes
        .iter()
        .skip(layout.node_edge_count_offset)
        .step_by(nfc)
        .map(|&c| c as u64)
        .sum();
    if declared_edges * efc as u64 != raw.edges.len() as u64 {
        return Err(SnapshotError::InvalidFormat(format!(
            "nodes declare {} edges but the edges array holds {}",
            declared_edges,
            raw.edges.len() / efc
        )));
    }

    let bad_target = raw
        .edges
        .iter()
        .skip(layout.edge_to_node_offset)
        .step_by(efc)
        .find(|&&to| to as usize >= raw.nodes.len() || to as usize % nfc != 0);
    if let Some(to) = bad_target {
        return Err(SnapshotError::InvalidFormat(format!(
            "edge target {} does not address a node",
            to
        )));
    }

    let string_count = raw.strings.len();
    let bad_node_name = raw
        .nodes
        .iter()
        .skip(layout.node_name_offset)
        .step_by(nfc)
        .find(|&&name| name as usize >= string_count);
    if let Some(name) = bad_node_name {
        return Err(SnapshotError::InvalidFormat(format!(
            "node name {} is outside the string table ({} strings)",
            name, string_count
        )));
    }

    // Element and hidden edges store a plain index in the name field.
    let bad_edge_name = raw.edges.chunks_exact(efc).find(|edge| {
        let named = !matches!(
            layout.edge_type(edge[layout.edge_type_offset]),
            EdgeType::Element | EdgeType::Hidden
        );
        named && edge[layout.edge_name_offset] as usize >= string_count
    });
    if let Some(edge) = bad_edge_name {
        return Err(SnapshotError::InvalidFormat(format!(
            "edge name {} is outside the string table ({} strings)",
            edge[layout.edge_name_offset], string_count
        )));
    }

    Ok(())
}

fn build_edge_indexes(layout: &SnapshotLayout, nodes: &[u32]) -> Vec<EdgeIndex> {
    let efc = layout.edge_field_count as u32;
    let mut first_edge_indexes = Vec::with_capacity(nodes.len() / layout.node_field_count + 1);
    let mut edge_index: EdgeIndex = 0;
    for edge_count in nodes
        .iter()
        .skip(layout.node_edge_count_offset)
        .step_by(layout.node_field_count)
    {
        first_edge_indexes.push(edge_index);
        edge_index += edge_count * efc;
    }
    first_edge_indexes.push(edge_index);
    first_edge_indexes
}
