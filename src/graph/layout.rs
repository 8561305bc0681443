use crate::parser::SnapshotMetadata;
use crate::types::SnapshotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Hidden,
    Array,
    String,
    Object,
    Code,
    Closure,
    RegExp,
    Number,
    Native,
    Synthetic,
    ConcatString,
    SlicedString,
    Symbol,
    BigInt,
    ObjectShape,
    /// A type name this engine has no special handling for.
    Unknown,
}

impl NodeType {
    /// Type names in the order V8 emits them.
    pub const V8_NAMES: [&'static str; 15] = [
        "hidden",
        "array",
        "string",
        "object",
        "code",
        "closure",
        "regexp",
        "number",
        "native",
        "synthetic",
        "concatenated string",
        "sliced string",
        "symbol",
        "bigint",
        "object shape",
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            "hidden" => NodeType::Hidden,
            "array" => NodeType::Array,
            "string" => NodeType::String,
            "object" => NodeType::Object,
            "code" => NodeType::Code,
            "closure" => NodeType::Closure,
            "regexp" => NodeType::RegExp,
            "number" => NodeType::Number,
            "native" => NodeType::Native,
            "synthetic" => NodeType::Synthetic,
            "concatenated string" => NodeType::ConcatString,
            "sliced string" => NodeType::SlicedString,
            "symbol" => NodeType::Symbol,
            "bigint" => NodeType::BigInt,
            "object shape" => NodeType::ObjectShape,
            _ => NodeType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Unknown => "unknown",
            other => Self::V8_NAMES[*other as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Context,
    Element,
    Property,
    Internal,
    Hidden,
    Shortcut,
    Weak,
    /// Not produced by V8; assigned to edges the graph decides to hide.
    Invisible,
    Unknown,
}

impl EdgeType {
    pub const V8_NAMES: [&'static str; 7] = [
        "context", "element", "property", "internal", "hidden", "shortcut", "weak",
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            "context" => EdgeType::Context,
            "element" => EdgeType::Element,
            "property" => EdgeType::Property,
            "internal" => EdgeType::Internal,
            "hidden" => EdgeType::Hidden,
            "shortcut" => EdgeType::Shortcut,
            "weak" => EdgeType::Weak,
            "invisible" => EdgeType::Invisible,
            _ => EdgeType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Invisible => "invisible",
            EdgeType::Unknown => "unknown",
            other => Self::V8_NAMES[*other as usize],
        }
    }
}

/// Field offsets and type tables resolved once from the snapshot header.
#[derive(Debug, Clone)]
pub struct SnapshotLayout {
    pub node_field_count: usize,
    pub node_type_offset: usize,
    pub node_name_offset: usize,
    pub node_id_offset: usize,
    pub node_self_size_offset: usize,
    pub node_edge_count_offset: usize,

    pub edge_field_count: usize,
    pub edge_type_offset: usize,
    pub edge_name_offset: usize,
    pub edge_to_node_offset: usize,

    node_type_names: Vec<String>,
    node_types: Vec<NodeType>,
    edge_type_names: Vec<String>,
    edge_types: Vec<EdgeType>,

    /// Raw value stored in an edge's type field once it has been hidden.
    pub invisible_edge_type: u32,
}

impl SnapshotLayout {
    pub fn from_meta(meta: &SnapshotMetadata) -> Result<Self, SnapshotError> {
        let node_field = |name: &str| field_offset(&meta.node_fields, name, "node");
        let edge_field = |name: &str| field_offset(&meta.edge_fields, name, "edge");

        let node_type_names = meta.node_type_names()?.to_vec();
        let mut edge_type_names = meta.edge_type_names()?.to_vec();
        let invisible_edge_type = edge_type_names.len() as u32;
        edge_type_names.push("invisible".to_string());

        Ok(Self {
            node_field_count: meta.node_field_count(),
            node_type_offset: node_field("type")?,
            node_name_offset: node_field("name")?,
            node_id_offset: node_field("id")?,
            node_self_size_offset: node_field("self_size")?,
            node_edge_count_offset: node_field("edge_count")?,

            edge_field_count: meta.edge_field_count(),
            edge_type_offset: edge_field("type")?,
            edge_name_offset: edge_field("name_or_index")?,
            edge_to_node_offset: edge_field("to_node")?,

            node_types: node_type_names.iter().map(|n| NodeType::from_name(n)).collect(),
            node_type_names,
            edge_types: edge_type_names.iter().map(|n| EdgeType::from_name(n)).collect(),
            edge_type_names,
            invisible_edge_type,
        })
    }

    pub fn node_type(&self, raw: u32) -> NodeType {
        self.node_types
            .get(raw as usize)
            .copied()
            .unwrap_or(NodeType::Unknown)
    }

    pub fn node_type_name(&self, raw: u32) -> &str {
        self.node_type_names
            .get(raw as usize)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    pub fn edge_type(&self, raw: u32) -> EdgeType {
        self.edge_types
            .get(raw as usize)
            .copied()
            .unwrap_or(EdgeType::Unknown)
    }

    pub fn edge_type_name(&self, raw: u32) -> &str {
        self.edge_type_names
            .get(raw as usize)
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

fn field_offset(fields: &[String], name: &str, kind: &'static str) -> Result<usize, SnapshotError> {
    fields
        .iter()
        .position(|f| f == name)
        .ok_or_else(|| SnapshotError::MissingField {
            kind,
            name: name.to_string(),
        })
}
