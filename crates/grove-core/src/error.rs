//! Error taxonomy for graph and tree operations

use thiserror::Error;

/// Errors raised by [`GraphStore`](crate::GraphStore) and
/// [`DependencyTree`](crate::DependencyTree).
///
/// Vertex ids are carried as their display strings so the error stays
/// independent of the store's key type.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("vertex already exists: {0}")]
    DuplicateVertex(String),

    #[error("vertex not found: {0}")]
    VertexNotFound(String),

    #[error("edge already exists: {from} -> {to}")]
    DuplicateEdge { from: String, to: String },

    #[error("edge not found: {from} -> {to}")]
    EdgeNotFound { from: String, to: String },

    #[error("vertex still has edges: {0}")]
    VertexHasEdges(String),

    /// No strict topological order exists. `remaining` lists the vertices
    /// that could not be ordered (every cycle member is among them).
    #[error("cycle detected among {} vertices: {}", remaining.len(), remaining.join(", "))]
    CycleDetected { remaining: Vec<String> },

    #[error("file {0} belongs to a different tree")]
    ForeignFile(String),

    /// File paths are kept as UTF-8 so ids and snapshots stay lossless.
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("number is not finite: {0}")]
    NonFiniteNumber(f64),

    #[error("file record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub(crate) fn not_found(id: impl std::fmt::Display) -> Self {
        GraphError::VertexNotFound(id.to_string())
    }

    pub(crate) fn edge_not_found(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        GraphError::EdgeNotFound {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
