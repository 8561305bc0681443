use std::fmt;
use std::ops::Range;

use super::layout::EdgeType;
use super::node::Node;
use super::snapshot::HeapSnapshot;
use crate::types::{EdgeIndex, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOrIndex<'a> {
    Name(&'a str),
    Index(u32),
}

impl<'a> NameOrIndex<'a> {
    pub fn is_str(&self, x: &str) -> bool {
        match self {
            NameOrIndex::Name(n) => *n == x,
            NameOrIndex::Index(_) => false,
        }
    }
}

impl fmt::Display for NameOrIndex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOrIndex::Name(name) => write!(f, "{}", name),
            NameOrIndex::Index(n) => write!(f, "{}", n),
        }
    }
}

/// A cursor over one edge record of the containment edges array.
#[derive(Clone, Copy)]
pub struct Edge<'a> {
    snapshot: &'a HeapSnapshot,
    edge_index: EdgeIndex,
}

impl<'a> Edge<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, edge_index: EdgeIndex) -> Self {
        debug_assert!(
            edge_index as usize % snapshot.layout.edge_field_count == 0,
            "edge index {edge_index} is not aligned to an edge record"
        );
        Edge {
            snapshot,
            edge_index,
        }
    }

    pub fn edge_index(&self) -> EdgeIndex {
        self.edge_index
    }

    fn field(&self, offset: usize) -> u32 {
        self.snapshot.containment_edges[self.edge_index as usize + offset]
    }

    pub fn raw_type(&self) -> u32 {
        self.field(self.snapshot.layout.edge_type_offset)
    }

    pub fn typ(&self) -> EdgeType {
        self.snapshot.layout.edge_type(self.raw_type())
    }

    pub fn type_name(&self) -> &'a str {
        self.snapshot.layout.edge_type_name(self.raw_type())
    }

    pub fn raw_name_or_index(&self) -> u32 {
        self.field(self.snapshot.layout.edge_name_offset)
    }

    /// Element and hidden edges carry a numeric index in their name field,
    /// everything else a string table index.
    pub(crate) fn stores_string_name(&self) -> bool {
        !self.is_element() && !self.is_hidden()
    }

    pub fn name(&self) -> NameOrIndex<'a> {
        let raw = self.raw_name_or_index();
        if !self.stores_string_name() {
            return NameOrIndex::Index(raw);
        }
        let name = self.snapshot.strings.at(raw);
        // Only plain decimal digits: "+1" and "-1" stay names.
        if self.is_shortcut() && !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = name.parse::<u32>() {
                return NameOrIndex::Index(index);
            }
        }
        NameOrIndex::Name(name)
    }

    pub fn has_string_name(&self) -> bool {
        matches!(self.name(), NameOrIndex::Name(_))
    }

    pub fn node_index(&self) -> NodeIndex {
        self.field(self.snapshot.layout.edge_to_node_offset)
    }

    pub fn node(&self) -> Node<'a> {
        Node::new(self.snapshot, self.node_index())
    }

    pub fn is_element(&self) -> bool {
        self.typ() == EdgeType::Element
    }

    pub fn is_hidden(&self) -> bool {
        self.typ() == EdgeType::Hidden
    }

    pub fn is_weak(&self) -> bool {
        self.typ() == EdgeType::Weak
    }

    pub fn is_internal(&self) -> bool {
        self.typ() == EdgeType::Internal
    }

    pub fn is_invisible(&self) -> bool {
        self.typ() == EdgeType::Invisible
    }

    pub fn is_shortcut(&self) -> bool {
        self.typ() == EdgeType::Shortcut
    }
}

fn fmt_property(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if name.contains(' ') {
        write!(f, "[\"{}\"]", name)
    } else {
        write!(f, ".{}", name)
    }
}

impl fmt::Display for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match (self.typ(), name) {
            (EdgeType::Context, _) => write!(f, "->{}", name),
            (EdgeType::Element, _) => write!(f, "[{}]", name),
            (EdgeType::Weak, _) => write!(f, "[[{}]]", name),
            (EdgeType::Property, _) => fmt_property(f, &name.to_string()),
            (EdgeType::Shortcut, NameOrIndex::Name(s)) => fmt_property(f, s),
            (EdgeType::Shortcut, NameOrIndex::Index(i)) => write!(f, "[{}]", i),
            (EdgeType::Internal | EdgeType::Hidden | EdgeType::Invisible, _) => {
                write!(f, "{{{}}}", name)
            }
            (EdgeType::Unknown, _) => write!(f, "?{}?", name),
        }
    }
}

impl fmt::Debug for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("edge_index", &self.edge_index)
            .field("type", &self.type_name())
            .field("name", &self.name())
            .field("to_node", &self.node_index())
            .finish()
    }
}

pub struct EdgeIter<'a> {
    snapshot: &'a HeapSnapshot,
    current: EdgeIndex,
    end: EdgeIndex,
}

impl<'a> EdgeIter<'a> {
    pub(crate) fn new(snapshot: &'a HeapSnapshot, range: Range<EdgeIndex>) -> Self {
        EdgeIter {
            snapshot,
            current: range.start,
            end: range.end,
        }
    }
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let edge = Edge::new(self.snapshot, self.current);
        self.current += self.snapshot.layout.edge_field_count as u32;
        Some(edge)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            (self.end - self.current) as usize / self.snapshot.layout.edge_field_count;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EdgeIter<'_> {}

/// An edge seen from its target: `node()` is the retainer, not the target.
#[derive(Clone, Copy)]
pub struct RetainerEdge<'a> {
    snapshot: &'a HeapSnapshot,
    retained_node_index: NodeIndex,
    retainer_index: u32,
}

impl<'a> RetainerEdge<'a> {
    pub(crate) fn new(
        snapshot: &'a HeapSnapshot,
        retained_node_index: NodeIndex,
        retainer_index: u32,
    ) -> Self {
        RetainerEdge {
            snapshot,
            retained_node_index,
            retainer_index,
        }
    }

    pub fn retainer_index(&self) -> u32 {
        self.retainer_index
    }

    pub fn edge(&self) -> Edge<'a> {
        Edge::new(
            self.snapshot,
            self.snapshot.retaining_edges[self.retainer_index as usize],
        )
    }

    pub fn node(&self) -> Node<'a> {
        Node::new(
            self.snapshot,
            self.snapshot.retaining_nodes[self.retainer_index as usize],
        )
    }

    pub fn retained_node(&self) -> Node<'a> {
        Node::new(self.snapshot, self.retained_node_index)
    }

    pub fn typ(&self) -> EdgeType {
        self.edge().typ()
    }

    pub fn name(&self) -> NameOrIndex<'a> {
        self.edge().name()
    }

    pub fn is_element(&self) -> bool {
        self.edge().is_element()
    }

    pub fn is_hidden(&self) -> bool {
        self.edge().is_hidden()
    }

    pub fn is_weak(&self) -> bool {
        self.edge().is_weak()
    }

    pub fn is_internal(&self) -> bool {
        self.edge().is_internal()
    }

    pub fn is_invisible(&self) -> bool {
        self.edge().is_invisible()
    }

    pub fn is_shortcut(&self) -> bool {
        self.edge().is_shortcut()
    }
}

impl fmt::Display for RetainerEdge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.edge(), f)
    }
}

pub struct RetainerIter<'a> {
    snapshot: &'a HeapSnapshot,
    retained_node_index: NodeIndex,
    range: Range<u32>,
}

impl<'a> RetainerIter<'a> {
    pub(crate) fn new(
        snapshot: &'a HeapSnapshot,
        retained_node_index: NodeIndex,
        range: Range<u32>,
    ) -> Self {
        RetainerIter {
            snapshot,
            retained_node_index,
            range,
        }
    }
}

impl<'a> Iterator for RetainerIter<'a> {
    type Item = RetainerEdge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|i| RetainerEdge::new(self.snapshot, self.retained_node_index, i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for RetainerIter<'_> {}
