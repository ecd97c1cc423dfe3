//! Test utilities for Grove

use crate::file::FileNode;
use crate::tree::DependencyTree;

/// A linear tree: `names[0]` is an entry, and each name is a dependency of
/// the one before it.
pub fn chain(names: &[&str]) -> DependencyTree {
    let mut tree = DependencyTree::new();
    if let Some(first) = names.first() {
        tree.add_file(*first, true);
    }
    for pair in names.windows(2) {
        tree.add_dependency(pair[0], pair[1]).unwrap();
    }
    tree
}

/// A tree built from `(child, parent)` edges; files are created on demand.
pub fn tree_with(edges: &[(&str, &str)]) -> DependencyTree {
    let mut tree = DependencyTree::new();
    for (child, parent) in edges {
        tree.add_file(*parent, false);
        tree.add_dependency(parent, *child).unwrap();
    }
    tree
}

/// Ids of `files`, for compact assertions.
pub fn ids<'a>(files: Vec<&'a FileNode>) -> Vec<&'a str> {
    files.into_iter().map(|f| f.id().as_str()).collect()
}
