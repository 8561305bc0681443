pub mod builder;
pub mod edge;
pub mod kind;
pub mod layout;
pub mod node;
pub mod petgraph_traits;
pub mod snapshot;

pub use builder::GraphBuilder;
pub use edge::{Edge, NameOrIndex, RetainerEdge};
pub use kind::{GenericKind, JsKind, SnapshotKind};
pub use layout::{EdgeType, NodeType, SnapshotLayout};
pub use node::{Node, SerializedNode};
pub use snapshot::HeapSnapshot;
