use serde::Deserialize;

use crate::types::SnapshotError;

/// A `node_types`/`edge_types` entry: either the enum list for that field,
/// or a plain descriptor such as `"number"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrStrings {
    Str(String),
    Strs(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotMetadata {
    pub node_fields: Vec<String>,
    pub node_types: Vec<StringOrStrings>,
    pub edge_fields: Vec<String>,
    pub edge_types: Vec<StringOrStrings>,
}

impl SnapshotMetadata {
    pub fn node_field_count(&self) -> usize {
        self.node_fields.len()
    }

    pub fn edge_field_count(&self) -> usize {
        self.edge_fields.len()
    }

    /// The enum list describing the `type` node field.
    pub fn node_type_names(&self) -> Result<&[String], SnapshotError> {
        type_names(&self.node_fields, &self.node_types, "node")
    }

    /// The enum list describing the `type` edge field.
    pub fn edge_type_names(&self) -> Result<&[String], SnapshotError> {
        type_names(&self.edge_fields, &self.edge_types, "edge")
    }
}

fn type_names<'a>(
    fields: &[String],
    types: &'a [StringOrStrings],
    kind: &'static str,
) -> Result<&'a [String], SnapshotError> {
    let offset = fields
        .iter()
        .position(|f| f == "type")
        .ok_or_else(|| SnapshotError::MissingField {
            kind,
            name: "type".to_string(),
        })?;

    match types.get(offset) {
        Some(StringOrStrings::Strs(names)) => Ok(names),
        _ => Err(SnapshotError::InvalidFormat(format!(
            "expected '{kind}_types[{offset}]' to be a list of strings"
        ))),
    }
}
