pub mod analysis;
pub mod graph;
pub mod parser;
pub mod report;
pub mod tracing_config;
pub mod types;
pub mod utils;

use anyhow::{Context, Result};
use std::path::Path;

use parser::SnapshotParser;

pub use analysis::{ClassAggregate, NodeFlags, Statistics, aggregate_by_class};
pub use graph::{
    Edge, EdgeType, GenericKind, GraphBuilder, HeapSnapshot, JsKind, NameOrIndex, Node,
    NodeType, RetainerEdge, SerializedNode, SnapshotKind,
};
pub use graph::kind::{containment_edges, retaining_edges};
pub use parser::RawSnapshot;
pub use types::{EdgeIndex, NodeIndex, NodeOrdinal, SnapshotError, SnapshotObjectId};

/// Reads a `.heapsnapshot` file and builds the analyzed graph from it.
pub fn load_snapshot<P: AsRef<Path>>(input_path: P) -> Result<HeapSnapshot> {
    let input_path = input_path.as_ref();
    let raw = SnapshotParser::new(input_path)?.parse()?;
    HeapSnapshot::new(raw)
        .with_context(|| format!("Invalid heap snapshot: {}", input_path.display()))
}
