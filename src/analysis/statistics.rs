use serde::Serialize;

use crate::graph::{HeapSnapshot, Node, NodeType};

/// Self-size buckets over the whole graph, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    pub v8heap: u64,
    pub native: u64,
    pub code: u64,
    pub js_arrays: u64,
    pub strings: u64,
}

impl HeapSnapshot {
    pub(crate) fn calculate_statistics(&self) -> Statistics {
        let mut native = 0u64;
        let mut code = 0u64;
        let mut strings = 0u64;
        let mut js_arrays = 0u64;

        for node in self.iter_nodes() {
            let size = node.self_size() as u64;
            match node.typ() {
                NodeType::Native => native += size,
                NodeType::Code => code += size,
                NodeType::ConcatString | NodeType::SlicedString | NodeType::String => {
                    strings += size
                }
                _ if node.raw_name() == "Array" => js_arrays += calculate_array_size(node),
                _ => {}
            }
        }

        let total = self.total_size();
        Statistics {
            total,
            v8heap: total - native,
            native,
            code,
            js_arrays,
            strings,
        }
    }
}

/// An array's own size plus its elements store, when nothing else shares it.
fn calculate_array_size(node: Node<'_>) -> u64 {
    let mut size = node.self_size() as u64;
    let elements = node
        .edges()
        .find(|e| e.is_internal() && e.name().is_str("elements"));
    if let Some(edge) = elements {
        let backing_store = edge.node();
        if backing_store.retainers_count() == 1 {
            size += backing_store.self_size() as u64;
        }
    }
    size
}
