use fixedbitset::FixedBitSet;
use petgraph::{
    Directed,
    visit::{GraphBase, GraphProp, IntoNeighbors, VisitMap, Visitable},
};

use super::edge::EdgeIter;
use super::snapshot::HeapSnapshot;
use crate::types::{EdgeIndex, NodeOrdinal};

impl GraphProp for HeapSnapshot {
    #[doc = r" The kind of edges in the graph."]
    type EdgeType = Directed;
}

impl GraphBase for HeapSnapshot {
    #[doc = r" edge identifier"]
    type EdgeId = EdgeIndex;

    #[doc = r" node identifier"]
    type NodeId = NodeOrdinal;
}

impl<'a> IntoNeighbors for &'a HeapSnapshot {
    type Neighbors = NeighborsIter<'a>;

    #[doc = r" Return an iterator of the neighbors of node `a`."]
    fn neighbors(self, a: Self::NodeId) -> Self::Neighbors {
        NeighborsIter {
            edges: self.node_by_ordinal(a).edges(),
        }
    }
}

/// Edge targets of one node, as ordinals.
pub struct NeighborsIter<'a> {
    edges: EdgeIter<'a>,
}

impl<'a> Iterator for NeighborsIter<'a> {
    type Item = NodeOrdinal;

    fn next(&mut self) -> Option<Self::Item> {
        self.edges.next().map(|e| e.node().ordinal())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.edges.size_hint()
    }
}

impl Visitable for HeapSnapshot {
    #[doc = r" The associated map type"]
    type Map = OrdinalBitSet;

    #[doc = r" Create a new visitor map"]
    fn visit_map(&self) -> Self::Map {
        OrdinalBitSet(FixedBitSet::with_capacity(self.node_count()))
    }

    #[doc = r" Reset the visitor map (and resize to new size of graph if needed)"]
    fn reset_map(&self, map: &mut Self::Map) {
        map.0.clear();
        map.0.grow(self.node_count());
    }
}

/// Newtype so we can implement VisitMap for FixedBitSet
pub struct OrdinalBitSet(FixedBitSet);

impl VisitMap<NodeOrdinal> for OrdinalBitSet {
    fn visit(&mut self, a: NodeOrdinal) -> bool {
        !self.0.put(a as usize)
    }

    fn is_visited(&self, a: &NodeOrdinal) -> bool {
        self.0.contains(*a as usize)
    }
}

#[cfg(test)]
mod tests {
    use petgraph::visit::{Bfs, Dfs};

    use crate::graph::builder::GraphBuilder;
    use crate::graph::layout::{EdgeType, NodeType};
    use crate::graph::HeapSnapshot;

    #[test]
    fn test_bfs_visits_reachable_nodes_once() {
        let mut b = GraphBuilder::new();
        let root = b.add_node(NodeType::Synthetic, "", 0);
        let a = b.add_node(NodeType::Object, "A", 1);
        let c = b.add_node(NodeType::Object, "C", 1);
        let _orphan = b.add_node(NodeType::Object, "Orphan", 1);
        b.add_indexed_edge(root, EdgeType::Element, 1, a);
        b.add_edge(a, EdgeType::Property, "c", c);
        b.add_edge(c, EdgeType::Property, "a", a);
        let snapshot = HeapSnapshot::new(b.finalize()).unwrap();

        let mut bfs = Bfs::new(&snapshot, root);
        let mut order = Vec::new();
        while let Some(nx) = bfs.next(&snapshot) {
            order.push(nx);
        }
        assert_eq!(order, vec![root, a, c]);

        let mut dfs = Dfs::new(&snapshot, c);
        let mut seen = 0;
        while dfs.next(&snapshot).is_some() {
            seen += 1;
        }
        assert_eq!(seen, 2);
    }
}
