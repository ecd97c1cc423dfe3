//! JSON persistence for dependency trees
//!
//! The persisted shape is
//!
//! ```json
//! { "files": [ ... ], "dependencies": [ ["child", "parent"], ... ] }
//! ```
//!
//! Files are written in insertion order and restored with their original
//! ids before any edge is re-created.

use crate::error::{GraphError, Result};
use crate::file::{FileId, FileNode};
use crate::options::TreeOptions;
use crate::props::Extensions;
use crate::tree::DependencyTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Serialized form of a [`FileNode`]. Carries no tree association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub path: PathBuf,
    pub history: Vec<PathBuf>,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub analyzed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl From<&FileNode> for FileRecord {
    fn from(node: &FileNode) -> Self {
        FileRecord {
            id: node.id().clone(),
            path: node.path().to_path_buf(),
            history: node.history().to_vec(),
            is_entry: node.is_entry(),
            analyzed: node.analyzed(),
            contents: node.contents().map(<[u8]>::to_vec),
            modified_at: node.modified_at(),
            extensions: node.extensions().clone(),
        }
    }
}

/// `path` must equal the last `history` entry; an empty history is
/// rebuilt from `path`.
impl TryFrom<FileRecord> for FileNode {
    type Error = GraphError;

    fn try_from(record: FileRecord) -> Result<Self> {
        if let Some(last) = record.history.last() {
            if *last != record.path {
                return Err(GraphError::InvalidRecord {
                    id: record.id.to_string(),
                    reason: format!(
                        "path {} does not match history entry {}",
                        record.path.display(),
                        last.display()
                    ),
                });
            }
        }
        Ok(FileNode::restore(
            record.id,
            record.path,
            record.history,
            record.is_entry,
            record.analyzed,
            record.contents,
            record.modified_at,
            record.extensions,
        ))
    }
}

/// A whole tree, ready for serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub files: Vec<FileRecord>,
    /// `(child, parent)` pairs.
    pub dependencies: Vec<(FileId, FileId)>,
}

impl DependencyTree {
    pub fn to_snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            files: self.iter().map(FileRecord::from).collect(),
            dependencies: self
                .graph()
                .edges()
                .into_iter()
                .map(|(child, parent)| (child.clone(), parent.clone()))
                .collect(),
        }
    }

    /// Rebuild a tree. Duplicate file ids fail with `DuplicateVertex`, edges
    /// naming unknown files with `VertexNotFound`, records whose `path`
    /// disagrees with their history with `InvalidRecord`.
    pub fn from_snapshot(snapshot: TreeSnapshot, options: TreeOptions) -> Result<Self> {
        let mut tree = DependencyTree::with_options(options);
        tree.restore(snapshot)?;
        Ok(tree)
    }

    /// Serialize to JSON; `indent` spaces per level, or compact when `None`.
    pub fn to_json_string(&self, indent: Option<usize>) -> Result<String> {
        let snapshot = self.to_snapshot();
        let Some(width) = indent else {
            return Ok(serde_json::to_string(&snapshot)?);
        };

        let pad = " ".repeat(width);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        snapshot.serialize(&mut ser)?;
        String::from_utf8(out).map_err(|e| GraphError::Serialization(serde::ser::Error::custom(e)))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Self::from_json_str_with(input, TreeOptions::default())
    }

    pub fn from_json_str_with(input: &str, options: TreeOptions) -> Result<Self> {
        let snapshot: TreeSnapshot = serde_json::from_str(input)?;
        Self::from_snapshot(snapshot, options)
    }
}

impl FromStr for DependencyTree {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        DependencyTree::from_json_str(s)
    }
}

/// Compact JSON. Paths are UTF-8 and numbers finite by construction, so
/// serialization does not fail for any reachable tree.
impl std::fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = self.to_json_string(None).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}
