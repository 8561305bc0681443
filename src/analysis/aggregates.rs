use ahash::AHashMap;
use serde::Serialize;

use crate::graph::{HeapSnapshot, SnapshotKind};
use crate::types::NodeIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAggregate {
    pub name: String,
    pub count: u32,
    pub self_size: u64,
    /// Index of the first node of this class, in node order.
    pub first_node_index: NodeIndex,
}

/// Groups the nodes the kind's class filter accepts by class, largest total
/// self size first.
pub fn aggregate_by_class<K: SnapshotKind + ?Sized>(
    snapshot: &HeapSnapshot,
    kind: &K,
) -> Vec<ClassAggregate> {
    let filter = kind.class_nodes_filter();
    let stride = snapshot.layout().node_field_count;
    let mut by_class: AHashMap<i64, ClassAggregate> = AHashMap::new();

    for node_index in (0..snapshot.node_count() * stride).step_by(stride) {
        let node = kind.create_node(snapshot, node_index as NodeIndex);
        if !filter.is_none_or(|f| f(&node)) {
            continue;
        }
        let aggregate = by_class
            .entry(node.class_index())
            .or_insert_with(|| ClassAggregate {
                name: node.class_name().into_owned(),
                count: 0,
                self_size: 0,
                first_node_index: node.node_index(),
            });
        aggregate.count += 1;
        aggregate.self_size += node.self_size() as u64;
    }

    let mut aggregates: Vec<ClassAggregate> = by_class.into_values().collect();
    aggregates.sort_by(|a, b| {
        b.self_size
            .cmp(&a.self_size)
            .then_with(|| a.name.cmp(&b.name))
    });
    aggregates
}
