/// Position of a node in the node list (`node_index / node_field_count`).
pub type NodeOrdinal = u32;

/// Offset of a node record in the flat `nodes` array.
pub type NodeIndex = u32;

/// Offset of an edge record in the flat `edges` array.
pub type EdgeIndex = u32;

/// Producer-assigned object id, stable across snapshots of the same heap.
pub type SnapshotObjectId = u32;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing {kind} field '{name}'")]
    MissingField { kind: &'static str, name: String },
}
