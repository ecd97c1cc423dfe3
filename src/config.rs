//! Repository-level configuration (`grove.toml`)

use anyhow::Context;
use grove_core::TreeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up at the repository root.
pub const CONFIG_FILE: &str = "grove.toml";

/// Settings read from `grove.toml`. Every key is optional.
///
/// ```toml
/// snapshot = "build/deps.json"
///
/// [tree]
/// id_strategy = "generated"
/// gc_orphans = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tree: TreeOptions,
    /// Snapshot location, relative to the repository root.
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Read `grove.toml` under `root`, or defaults when there is none.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        match &self.snapshot {
            Some(path) => root.join(path),
            None => crate::cache::snapshot_path(root),
        }
    }
}
