use ahash::AHashMap;

use super::layout::{EdgeType, NodeType};
use crate::parser::{RawSnapshot, SnapshotMetadata, StringOrStrings};
use crate::types::{NodeOrdinal, SnapshotObjectId};

const NODE_FIELDS: [&str; 6] = ["type", "name", "id", "self_size", "edge_count", "trace_node_id"];
const EDGE_FIELDS: [&str; 3] = ["type", "name_or_index", "to_node"];

struct PendingNode {
    typ: NodeType,
    name: u32,
    id: SnapshotObjectId,
    self_size: u32,
}

struct PendingEdge {
    from: NodeOrdinal,
    typ: EdgeType,
    name_or_index: u32,
    to: NodeOrdinal,
}

/// Assembles a `RawSnapshot` in V8's layout from individual nodes and edges.
///
/// Edges may be added in any order; `finalize` groups them by source node
/// while keeping their relative order. The first node added is the root.
#[derive(Default)]
pub struct GraphBuilder {
    strings: Vec<String>,
    string_ids: AHashMap<String, u32>,
    nodes: Vec<PendingNode>,
    edges: Vec<PendingEdge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.intern("");
        builder
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.string_ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), id);
        id
    }

    pub fn add_node(&mut self, typ: NodeType, name: &str, self_size: u32) -> NodeOrdinal {
        let name = self.intern(name);
        let ordinal = self.nodes.len() as NodeOrdinal;
        self.nodes.push(PendingNode {
            typ,
            name,
            // V8 hands out odd ids to heap objects.
            id: ordinal * 2 + 1,
            self_size,
        });
        ordinal
    }

    /// Adds an edge whose name field is a string: every edge type except
    /// element and hidden.
    pub fn add_edge(&mut self, from: NodeOrdinal, typ: EdgeType, name: &str, to: NodeOrdinal) {
        debug_assert!(!matches!(typ, EdgeType::Element | EdgeType::Hidden));
        let name_or_index = self.intern(name);
        self.edges.push(PendingEdge {
            from,
            typ,
            name_or_index,
            to,
        });
    }

    /// Adds an element or hidden edge, whose name field is a plain index.
    pub fn add_indexed_edge(&mut self, from: NodeOrdinal, typ: EdgeType, index: u32, to: NodeOrdinal) {
        debug_assert!(matches!(typ, EdgeType::Element | EdgeType::Hidden));
        self.edges.push(PendingEdge {
            from,
            typ,
            name_or_index: index,
            to,
        });
    }

    pub fn finalize(mut self) -> RawSnapshot {
        let stride = NODE_FIELDS.len() as u32;
        let mut edge_counts = vec![0u32; self.nodes.len()];
        for edge in &self.edges {
            edge_counts[edge.from as usize] += 1;
        }

        // Stable, so edges keep their insertion order within a node.
        self.edges.sort_by_key(|e| e.from);

        let mut nodes = Vec::with_capacity(self.nodes.len() * NODE_FIELDS.len());
        for (node, edge_count) in self.nodes.iter().zip(edge_counts) {
            nodes.extend_from_slice(&[
                node_type_value(node.typ),
                node.name,
                node.id,
                node.self_size,
                edge_count,
                0,
            ]);
        }

        let mut edges = Vec::with_capacity(self.edges.len() * EDGE_FIELDS.len());
        for edge in &self.edges {
            edges.extend_from_slice(&[
                edge_type_value(edge.typ),
                edge.name_or_index,
                edge.to * stride,
            ]);
        }

        RawSnapshot {
            meta: v8_metadata(),
            root_index: 0,
            nodes,
            edges,
            strings: self.strings,
        }
    }
}

fn node_type_value(typ: NodeType) -> u32 {
    NodeType::V8_NAMES
        .iter()
        .position(|n| *n == typ.as_str())
        .unwrap_or_else(|| panic!("node type {:?} has no V8 encoding", typ)) as u32
}

fn edge_type_value(typ: EdgeType) -> u32 {
    EdgeType::V8_NAMES
        .iter()
        .position(|n| *n == typ.as_str())
        .unwrap_or_else(|| panic!("edge type {:?} has no V8 encoding", typ)) as u32
}

/// Header matching what current V8 versions emit.
pub fn v8_metadata() -> SnapshotMetadata {
    let strs = |names: &[&str]| StringOrStrings::Strs(names.iter().map(|s| s.to_string()).collect());
    let s = |name: &str| StringOrStrings::Str(name.to_string());

    SnapshotMetadata {
        node_fields: NODE_FIELDS.iter().map(|s| s.to_string()).collect(),
        node_types: vec![
            strs(&NodeType::V8_NAMES[..]),
            s("string"),
            s("number"),
            s("number"),
            s("number"),
            s("number"),
        ],
        edge_fields: EDGE_FIELDS.iter().map(|s| s.to_string()).collect(),
        edge_types: vec![strs(&EdgeType::V8_NAMES[..]), s("string_or_number"), s("node")],
    }
}
