//! Tree diff computation for incremental rebuilds

use crate::file::FileId;
use crate::tree::DependencyTree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What changed between two states of a tree, typically the snapshot of
/// the previous build and the freshly analyzed tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    /// Files only present in the new tree.
    pub added_files: Vec<FileId>,
    /// Files only present in the old tree.
    pub removed_files: Vec<FileId>,
    /// `(child, parent)` edges only present in the new tree.
    pub added_dependencies: Vec<(FileId, FileId)>,
    /// `(child, parent)` edges only present in the old tree.
    pub removed_dependencies: Vec<(FileId, FileId)>,
    /// Files present in both whose payload differs.
    pub modified_files: Vec<FileId>,
}

impl TreeDiff {
    /// Compare `old` against `new`. Lists follow the insertion order of the
    /// tree each entry comes from.
    pub fn between(old: &DependencyTree, new: &DependencyTree) -> Self {
        let mut diff = TreeDiff::default();

        for node in new.iter() {
            match old.file(node.id()) {
                None => diff.added_files.push(node.id().clone()),
                Some(previous) if previous != node => diff.modified_files.push(node.id().clone()),
                Some(_) => {}
            }
        }
        for node in old.iter() {
            if !new.has_file(node.id()) {
                diff.removed_files.push(node.id().clone());
            }
        }

        let old_edges: HashSet<(&FileId, &FileId)> = old.graph().edges().into_iter().collect();
        let new_edges = new.graph().edges();
        let new_set: HashSet<(&FileId, &FileId)> = new_edges.iter().copied().collect();

        for &(child, parent) in &new_edges {
            if !old_edges.contains(&(child, parent)) {
                diff.added_dependencies.push((child.clone(), parent.clone()));
            }
        }
        for (child, parent) in old.graph().edges() {
            if !new_set.contains(&(child, parent)) {
                diff.removed_dependencies.push((child.clone(), parent.clone()));
            }
        }

        diff
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_files.is_empty()
            && self.removed_files.is_empty()
            && self.added_dependencies.is_empty()
            && self.removed_dependencies.is_empty()
            && self.modified_files.is_empty()
    }

    /// Files a rebuild has to revisit: added or modified ones.
    pub fn touched_files(&self) -> impl Iterator<Item = &FileId> + '_ {
        self.added_files.iter().chain(self.modified_files.iter())
    }
}
