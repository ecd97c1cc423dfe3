//! On-disk snapshot of the dependency tree

use anyhow::Context;
use grove_core::{DependencyTree, TreeOptions};
use std::path::{Path, PathBuf};

/// Cache directory: .grove/
pub const CACHE_DIR: &str = ".grove";

/// Tree snapshot file
pub const TREE_SNAPSHOT: &str = "tree.json";

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get default snapshot file path
pub fn snapshot_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(TREE_SNAPSHOT)
}

/// Write the tree as pretty JSON, creating parent directories as needed.
pub fn save_tree(tree: &DependencyTree, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let json = tree.to_json_string(Some(2))?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

    tracing::debug!("Tree snapshot saved: {}", path.display());
    Ok(())
}

/// Load a snapshot; `None` when the file does not exist.
pub fn load_tree(path: &Path, options: TreeOptions) -> anyhow::Result<Option<DependencyTree>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tree = DependencyTree::from_json_str_with(&json, options)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;

    tracing::debug!("Tree snapshot loaded from: {}", path.display());
    Ok(Some(tree))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_tree() {
        let dir = TempDir::new().unwrap();
        let path = snapshot_path(dir.path());

        let mut tree = DependencyTree::new();
        tree.add_file("/main.rs", true);
        tree.add_dependency("/main.rs", "/lib.rs").unwrap();
        save_tree(&tree, &path).unwrap();

        let loaded = load_tree(&path, TreeOptions::default()).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.has_dependency("/main.rs", "/lib.rs"));

        clear_cache(dir.path()).unwrap();
        assert!(load_tree(&path, TreeOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_tree(&path, TreeOptions::default()).is_err());
    }
}
