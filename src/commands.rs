//! CLI command implementations
//!
//! Each command loads the persisted tree, works on it, saves it back when
//! it changed, and returns the text to print.

use crate::cache;
use crate::config::Config;
use anyhow::Context;
use grove_core::{DependencyTree, FileId, FileNode, Order, TreeDiff};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A repository root together with its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let config = Config::load(&root)?;
        Ok(Workspace { root, config })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.snapshot_path(&self.root)
    }

    /// The persisted tree, or an empty one when nothing was saved yet.
    pub fn load(&self) -> anyhow::Result<DependencyTree> {
        let tree = cache::load_tree(&self.snapshot_path(), self.config.tree)?;
        Ok(tree.unwrap_or_else(|| DependencyTree::with_options(self.config.tree)))
    }

    pub fn save(&self, tree: &DependencyTree) -> anyhow::Result<()> {
        cache::save_tree(tree, &self.snapshot_path())
    }
}

#[derive(Serialize)]
struct StatsReport {
    files: usize,
    dependencies: usize,
    entries: usize,
    cycles: usize,
}

/// Track a file, optionally as a dependency of `parent`. Dependencies are
/// never entry files, so `entry` and `parent` are exclusive.
pub fn add(ws: &Workspace, path: &str, entry: bool, parent: Option<&str>) -> anyhow::Result<String> {
    if entry && parent.is_some() {
        anyhow::bail!("{path} cannot be both an entry and a dependency");
    }
    let mut tree = ws.load()?;
    let id = match parent {
        Some(parent) => {
            let child = tree
                .add_dependency(parent, path)
                .with_context(|| format!("adding {path} as a dependency of {parent}"))?;
            child.id().clone()
        }
        None => tree.add_file(path, entry).id().clone(),
    };
    ws.save(&tree)?;
    tracing::info!("Tracked {} ({} files)", id, tree.len());
    Ok(id.to_string())
}

/// Remove a file; `force` also drops its edges.
pub fn remove(ws: &Workspace, id: &str, force: bool) -> anyhow::Result<String> {
    let mut tree = ws.load()?;
    let node = tree.remove_file(id, force).with_context(|| format!("removing {id}"))?;
    ws.save(&tree)?;
    Ok(node.id().to_string())
}

pub fn stats(ws: &Workspace) -> anyhow::Result<String> {
    let tree = ws.load()?;
    let stats = tree.stats();
    let report = StatsReport {
        files: stats.files,
        dependencies: stats.dependencies,
        entries: stats.entries,
        cycles: tree.cycles().len(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Every file, in topological or insertion order.
pub fn order(ws: &Workspace, topological: bool) -> anyhow::Result<String> {
    let tree = ws.load()?;
    let order = if topological { Order::Topological } else { Order::Graph };
    let ids = tree.file_ids(order).context("ordering files")?;
    Ok(lines(ids.iter()))
}

/// Dependencies (or dependants) of one file.
pub fn deps(ws: &Workspace, id: &str, recursive: bool, dependants: bool) -> anyhow::Result<String> {
    let tree = ws.load()?;
    let files = if dependants {
        tree.dependants_of(id, recursive)?
    } else {
        tree.dependencies_of(id, recursive)?
    };
    Ok(lines(files.into_iter().map(FileNode::id)))
}

pub fn entries(ws: &Workspace, from: Option<&str>) -> anyhow::Result<String> {
    let tree = ws.load()?;
    let files = tree.entries(from)?;
    Ok(lines(files.into_iter().map(FileNode::id)))
}

/// Prune everything unreachable from `anchors`, or from the entry files
/// when no anchor is given.
pub fn prune(ws: &Workspace, anchors: &[String]) -> anyhow::Result<String> {
    let mut tree = ws.load()?;
    let removed = if anchors.is_empty() {
        tree.prune_entries()?
    } else {
        let anchors: Vec<FileId> = anchors.iter().map(|a| FileId::from(a.as_str())).collect();
        tree.prune(&anchors)?
    };
    ws.save(&tree)?;
    tracing::info!("Pruned {} files, {} left", removed.len(), tree.len());
    Ok(lines(removed.iter()))
}

pub fn break_cycles(ws: &Workspace, max_passes: usize) -> anyhow::Result<String> {
    let mut tree = ws.load()?;
    let report = tree.remove_cycles_until_stable(max_passes)?;
    ws.save(&tree)?;

    let mut out: Vec<String> = report
        .removed
        .iter()
        .map(|(child, parent)| format!("{child} -> {parent}"))
        .collect();
    out.push(format!(
        "{} edges removed in {} passes, {}",
        report.removed.len(),
        report.passes,
        if report.acyclic { "acyclic" } else { "cycles remain" }
    ));
    Ok(out.join("\n"))
}

/// Changes from the snapshot at `other` to the current tree.
pub fn diff(ws: &Workspace, other: &Path) -> anyhow::Result<String> {
    let current = ws.load()?;
    let previous = cache::load_tree(other, ws.config.tree)?
        .with_context(|| format!("no snapshot at {}", other.display()))?;
    let diff = TreeDiff::between(&previous, &current);
    Ok(serde_json::to_string_pretty(&diff)?)
}

pub fn clear(ws: &Workspace) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", ws.root.display());

    cache::clear_cache(&ws.root)?;

    tracing::info!("Cache cleared");
    Ok(())
}

fn lines<'a>(ids: impl Iterator<Item = &'a FileId>) -> String {
    ids.map(FileId::as_str).collect::<Vec<_>>().join("\n")
}
