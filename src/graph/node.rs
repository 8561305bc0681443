use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use super::edge::{EdgeIter, RetainerIter};
use super::layout::NodeType;
use super::snapshot::HeapSnapshot;
use crate::analysis::flags::NodeFlags;
use crate::types::{EdgeIndex, NodeIndex, NodeOrdinal, SnapshotObjectId};

/// A cursor over one node record. Carries nothing but the record's offset and
/// a reference to the shared arrays, so it is free to copy around.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    snapshot: &'a HeapSnapshot,
    node_index: NodeIndex,
}

impl<'a> Node<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, node_index: NodeIndex) -> Self {
        debug_assert!(
            node_index as usize % snapshot.layout.node_field_count == 0,
            "node index {node_index} is not aligned to a node record"
        );
        Node {
            snapshot,
            node_index,
        }
    }

    pub fn snapshot(&self) -> &'a HeapSnapshot {
        self.snapshot
    }

    pub fn node_index(&self) -> NodeIndex {
        self.node_index
    }

    pub fn ordinal(&self) -> NodeOrdinal {
        self.node_index / self.snapshot.layout.node_field_count as u32
    }

    fn field(&self, offset: usize) -> u32 {
        self.snapshot.nodes[self.node_index as usize + offset]
    }

    pub fn raw_type(&self) -> u32 {
        self.field(self.snapshot.layout.node_type_offset)
    }

    pub fn typ(&self) -> NodeType {
        self.snapshot.layout.node_type(self.raw_type())
    }

    pub fn type_name(&self) -> &'a str {
        self.snapshot.layout.node_type_name(self.raw_type())
    }

    /// The string table entry named by this record, without cons-string
    /// resolution.
    pub fn raw_name(&self) -> &'a str {
        self.snapshot
            .strings
            .at(self.field(self.snapshot.layout.node_name_offset))
    }

    pub fn name(&self) -> Cow<'a, str> {
        if self.typ() == NodeType::ConcatString {
            Cow::Owned(self.snapshot.cons_string_name(self.node_index))
        } else {
            Cow::Borrowed(self.raw_name())
        }
    }

    pub fn class_name(&self) -> Cow<'a, str> {
        match self.typ() {
            NodeType::Hidden => Cow::Borrowed("(system)"),
            NodeType::Object | NodeType::Native => self.name(),
            NodeType::Code => Cow::Borrowed("(compiled code)"),
            _ => Cow::Owned(format!("({})", self.type_name())),
        }
    }

    /// Key grouping nodes of the same class: the name index for objects and
    /// native nodes, a negative per-type value for everything else.
    pub fn class_index(&self) -> i64 {
        match self.typ() {
            NodeType::Object | NodeType::Native => {
                self.field(self.snapshot.layout.node_name_offset) as i64
            }
            _ => -1 - self.raw_type() as i64,
        }
    }

    pub fn id(&self) -> SnapshotObjectId {
        self.field(self.snapshot.layout.node_id_offset)
    }

    pub fn self_size(&self) -> u32 {
        self.field(self.snapshot.layout.node_self_size_offset)
    }

    pub fn edge_count(&self) -> u32 {
        self.field(self.snapshot.layout.node_edge_count_offset)
    }

    /// `[first, end)` offsets of this node's slice of the edges array.
    pub fn edge_index_range(&self) -> Range<EdgeIndex> {
        let ordinal = self.ordinal() as usize;
        self.snapshot.first_edge_indexes[ordinal]..self.snapshot.first_edge_indexes[ordinal + 1]
    }

    pub fn edges(&self) -> EdgeIter<'a> {
        EdgeIter::new(self.snapshot, self.edge_index_range())
    }

    /// Positions of this node's incoming edges in the retainer index.
    pub fn retainer_index_range(&self) -> Range<u32> {
        let ordinal = self.ordinal() as usize;
        self.snapshot.first_retainer_index[ordinal]..self.snapshot.first_retainer_index[ordinal + 1]
    }

    pub fn retainers(&self) -> RetainerIter<'a> {
        RetainerIter::new(self.snapshot, self.node_index, self.retainer_index_range())
    }

    pub fn retainers_count(&self) -> u32 {
        self.retainer_index_range().len() as u32
    }

    pub fn is_root(&self) -> bool {
        self.node_index == self.snapshot.root_node_index()
    }

    pub fn is_hidden(&self) -> bool {
        self.typ() == NodeType::Hidden
    }

    pub fn is_synthetic(&self) -> bool {
        self.typ() == NodeType::Synthetic
    }

    pub fn is_user_root(&self) -> bool {
        !self.is_synthetic()
    }

    pub fn is_document_dom_trees_root(&self) -> bool {
        self.is_synthetic() && self.raw_name() == "(Document DOM trees)"
    }

    fn flags(&self) -> u32 {
        self.snapshot.flags_of(self.ordinal())
    }

    pub fn can_be_queried(&self) -> bool {
        self.flags() & NodeFlags::CAN_BE_QUERIED != 0
    }

    /// Whether the node is owned by the inspected page rather than by
    /// engine or debugger state.
    pub fn is_user_object(&self) -> bool {
        self.flags() & NodeFlags::PAGE_OBJECT != 0
    }

    pub fn is_detached_dom_tree_node(&self) -> bool {
        self.flags() & NodeFlags::DETACHED_DOM_TREE_NODE != 0
    }

    pub fn serialize(&self) -> SerializedNode {
        SerializedNode {
            id: self.id(),
            name: self.name().into_owned(),
            node_index: self.node_index,
            typ: self.type_name().to_string(),
            self_size: self.self_size(),
            edges_count: self.edge_count(),
            can_be_queried: self.can_be_queried(),
            detached_dom_tree_node: self.is_detached_dom_tree_node(),
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("node_index", &self.node_index)
            .field("type", &self.type_name())
            .field("name", &self.raw_name())
            .field("id", &self.id())
            .finish()
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.snapshot, other.snapshot) && self.node_index == other.node_index
    }
}

impl Eq for Node<'_> {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub id: SnapshotObjectId,
    pub name: String,
    pub node_index: NodeIndex,
    #[serde(rename = "type")]
    pub typ: String,
    pub self_size: u32,
    pub edges_count: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub can_be_queried: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub detached_dom_tree_node: bool,
}
