pub mod metadata;
pub mod string_table;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::types::SnapshotError;

pub use metadata::{SnapshotMetadata, StringOrStrings};
pub use string_table::StringTable;

#[derive(Deserialize)]
struct SnapshotFile {
    snapshot: SnapshotSection,
    nodes: Vec<u32>,
    edges: Vec<u32>,
    strings: Vec<String>,
}

#[derive(Deserialize)]
struct SnapshotSection {
    meta: SnapshotMetadata,
    #[serde(default)]
    root_index: u32,
}

/// A fully assembled snapshot buffer: everything the graph needs, still in
/// the producer's flat layout.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub meta: SnapshotMetadata,
    /// Node index (not ordinal) of the synthetic root.
    pub root_index: u32,
    pub nodes: Vec<u32>,
    pub edges: Vec<u32>,
    pub strings: Vec<String>,
}

impl RawSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        let file: SnapshotFile = serde_json::from_reader(reader)?;
        Ok(file.into())
    }

    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        Ok(file.into())
    }
}

impl From<SnapshotFile> for RawSnapshot {
    fn from(value: SnapshotFile) -> Self {
        RawSnapshot {
            meta: value.snapshot.meta,
            root_index: value.snapshot.root_index,
            nodes: value.nodes,
            edges: value.edges,
            strings: value.strings,
        }
    }
}

pub struct SnapshotParser {
    path: PathBuf,
}

impl SnapshotParser {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            anyhow::bail!("Snapshot file does not exist: {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn parse(&self) -> Result<RawSnapshot> {
        let file = File::open(&self.path).context("Failed to open snapshot file")?;
        let reader = BufReader::new(file);

        RawSnapshot::from_reader(reader).context("Failed to parse snapshot JSON")
    }
}
