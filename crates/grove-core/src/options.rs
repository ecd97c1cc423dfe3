//! Tree configuration

use serde::{Deserialize, Serialize};

/// How new files get their ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// The id is the file's original path.
    #[default]
    Path,
    /// The id is a random UUID, decoupled from the path.
    Generated,
}

/// Behaviour switches for a [`DependencyTree`](crate::DependencyTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    pub id_strategy: IdStrategy,
    /// Removing the last dependant edge of a non-entry file also removes
    /// the file.
    pub gc_orphans: bool,
}

impl TreeOptions {
    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn with_gc_orphans(mut self, enabled: bool) -> Self {
        self.gc_orphans = enabled;
        self
    }
}
