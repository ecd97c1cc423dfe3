//! Per-file payload stored at each vertex of the dependency tree

use crate::error::{GraphError, Result};
use crate::props::{Extensions, PropValue};
use crate::tree::DependencyTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a file within one tree.
///
/// Either the file's original path or a generated UUID, depending on
/// [`IdStrategy`](crate::IdStrategy). Never changes for the file's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        FileId(id.into())
    }

    /// The path itself as the id. Fails for paths that are not UTF-8.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(FileId(utf8_path(path)?.to_owned()))
    }

    /// A fresh random id, unrelated to any path.
    pub fn generate() -> Self {
        FileId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for FileId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FileId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        FileId(value.to_string())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        FileId(value)
    }
}

/// Token naming the tree a file belongs to.
///
/// A lookup-only association: it never keeps a tree alive, it only lets
/// delegating helpers reject a tree the file does not belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TreeId(u64);

impl TreeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

fn utf8_path(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| GraphError::InvalidPath(path.to_string_lossy().into_owned()))
}

/// Parameters for creating a file.
///
/// Paths are UTF-8; a `Path` converts with `FileParams::try_from`.
#[derive(Debug, Clone, Default)]
pub struct FileParams {
    pub path: String,
    /// Explicit id; otherwise derived per the tree's id strategy.
    pub id: Option<FileId>,
    pub contents: Option<Vec<u8>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub extensions: Extensions,
    /// Replace the payload of an existing file with the same id.
    pub force: bool,
}

impl FileParams {
    pub fn new(path: impl Into<String>) -> Self {
        FileParams {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<FileId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn with_modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

impl From<&str> for FileParams {
    fn from(value: &str) -> Self {
        FileParams::new(value)
    }
}

impl From<String> for FileParams {
    fn from(value: String) -> Self {
        FileParams::new(value)
    }
}

impl TryFrom<&Path> for FileParams {
    type Error = GraphError;

    fn try_from(value: &Path) -> Result<Self> {
        Ok(FileParams::new(utf8_path(value)?))
    }
}

impl TryFrom<PathBuf> for FileParams {
    type Error = GraphError;

    fn try_from(value: PathBuf) -> Result<Self> {
        let path = value
            .into_os_string()
            .into_string()
            .map_err(|raw| GraphError::InvalidPath(raw.to_string_lossy().into_owned()))?;
        Ok(FileParams::new(path))
    }
}

/// A tracked file.
///
/// `history` holds every path the file has had, oldest first. The current
/// path is the last entry and the original path is the first, which never
/// changes.
#[derive(Debug, Clone)]
pub struct FileNode {
    id: FileId,
    tree: TreeId,
    history: Vec<PathBuf>,
    is_entry: bool,
    analyzed: bool,
    contents: Option<Vec<u8>>,
    modified_at: Option<DateTime<Utc>>,
    extensions: Extensions,
}

/// Equality over every field except the tree association.
impl PartialEq for FileNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.history == other.history
            && self.is_entry == other.is_entry
            && self.analyzed == other.analyzed
            && self.contents == other.contents
            && self.modified_at == other.modified_at
            && self.extensions == other.extensions
    }
}

impl FileNode {
    pub(crate) fn from_params(id: FileId, params: FileParams, is_entry: bool, tree: TreeId) -> Self {
        FileNode {
            id,
            tree,
            history: vec![PathBuf::from(params.path)],
            is_entry,
            analyzed: false,
            contents: params.contents,
            modified_at: params.modified_at,
            extensions: params.extensions,
        }
    }

    /// Rebuild a node from its serialized parts. An empty history falls
    /// back to `path`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: FileId,
        path: PathBuf,
        mut history: Vec<PathBuf>,
        is_entry: bool,
        analyzed: bool,
        contents: Option<Vec<u8>>,
        modified_at: Option<DateTime<Utc>>,
        extensions: Extensions,
    ) -> Self {
        if history.is_empty() {
            history.push(path);
        }
        FileNode {
            id,
            tree: TreeId::default(),
            history,
            is_entry,
            analyzed,
            contents,
            modified_at,
            extensions,
        }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn tree(&self) -> TreeId {
        self.tree
    }

    /// Current location.
    pub fn path(&self) -> &Path {
        self.history.last().map_or(Path::new(""), PathBuf::as_path)
    }

    /// Location the file was created with.
    pub fn initial_path(&self) -> &Path {
        self.history.first().map_or(Path::new(""), PathBuf::as_path)
    }

    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    /// Move the file to a new location, recording it in the history.
    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = PathBuf::from(path.into());
        if path.as_path() != self.path() {
            self.history.push(path);
        }
    }

    /// True when `path` is the current path or any earlier one.
    pub fn has_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.history.iter().any(|p| p == path)
    }

    /// Logical type, taken from the current path's extension.
    pub fn file_type(&self) -> Option<&str> {
        self.path().extension().and_then(|e| e.to_str())
    }

    /// Type of the original path.
    pub fn initial_type(&self) -> Option<&str> {
        self.initial_path().extension().and_then(|e| e.to_str())
    }

    /// Change the logical type by appending a path with the new extension.
    pub fn set_file_type(&mut self, file_type: &str) {
        // UTF-8 path with a UTF-8 extension stays UTF-8.
        if let Ok(next) = self.path().with_extension(file_type).into_os_string().into_string() {
            self.set_path(next);
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path().file_name().and_then(|n| n.to_str())
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.path().file_stem().and_then(|n| n.to_str())
    }

    pub fn parent_dir(&self) -> Option<&Path> {
        self.path().parent()
    }

    pub fn is_entry(&self) -> bool {
        self.is_entry
    }

    pub fn analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn set_analyzed(&mut self, analyzed: bool) {
        self.analyzed = analyzed;
    }

    pub fn contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) {
        self.contents = Some(contents.into());
    }

    pub fn take_contents(&mut self) -> Option<Vec<u8>> {
        self.contents.take()
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn set_modified_at(&mut self, at: Option<DateTime<Utc>>) {
        self.modified_at = at;
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn extension(&self, key: &str) -> Option<&PropValue> {
        self.extensions.get(key)
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Option<PropValue> {
        self.extensions.insert(key.into(), value.into())
    }

    /// Mark the file for re-analysis: forget every path after the original,
    /// drop the contents and clear `analyzed`.
    pub fn dirty(&mut self) {
        self.history.truncate(1);
        self.contents = None;
        self.analyzed = false;
    }

    /// Copy of this node bound to `tree`, or to its current tree when `None`.
    pub fn rehome(&self, tree: Option<TreeId>) -> FileNode {
        FileNode {
            tree: tree.unwrap_or(self.tree),
            ..self.clone()
        }
    }

    pub(crate) fn bind(&mut self, tree: TreeId) {
        self.tree = tree;
    }

    /// Files this one depends on, via the owning tree.
    pub fn dependencies<'t>(&self, tree: &'t DependencyTree, recursive: bool) -> Result<Vec<&'t FileNode>> {
        self.check_owner(tree)?;
        tree.dependencies_of(&self.id, recursive)
    }

    /// Files depending on this one, via the owning tree.
    pub fn dependants<'t>(&self, tree: &'t DependencyTree, recursive: bool) -> Result<Vec<&'t FileNode>> {
        self.check_owner(tree)?;
        tree.dependants_of(&self.id, recursive)
    }

    pub fn has_dependency(&self, tree: &DependencyTree, child: &str) -> Result<bool> {
        self.check_owner(tree)?;
        Ok(tree.has_dependency(&self.id, child))
    }

    pub fn has_dependant(&self, tree: &DependencyTree, parent: &str) -> Result<bool> {
        self.check_owner(tree)?;
        Ok(tree.has_dependant(&self.id, parent))
    }

    fn check_owner(&self, tree: &DependencyTree) -> Result<()> {
        if self.tree == tree.id() {
            Ok(())
        } else {
            Err(GraphError::ForeignFile(self.id.to_string()))
        }
    }
}

/// Mutable handle on one file of a tree.
///
/// Obtained from [`DependencyTree::file_handle`]. Forwards edge operations to
/// the tree using this file's id, so code holding a file can edit its
/// dependencies without juggling borrows.
pub struct FileMut<'a> {
    tree: &'a mut DependencyTree,
    id: FileId,
}

impl<'a> FileMut<'a> {
    pub(crate) fn new(tree: &'a mut DependencyTree, id: FileId) -> Self {
        FileMut { tree, id }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    /// The file, unless an operation on this handle removed it.
    pub fn node(&self) -> Option<&FileNode> {
        self.tree.file(&self.id)
    }

    pub fn node_mut(&mut self) -> Option<&mut FileNode> {
        self.tree.file_mut(&self.id)
    }

    pub fn add_dependency(&mut self, child: impl Into<FileParams>) -> Result<FileId> {
        let child = self.tree.add_dependency(&self.id, child)?;
        Ok(child.id().clone())
    }

    pub fn remove_dependency(&mut self, child: &str) -> Result<()> {
        self.tree.remove_dependency(&self.id, child)
    }

    pub fn add_dependant(&mut self, parent: impl Into<FileParams>) -> Result<FileId> {
        let parent = self.tree.add_dependant(&self.id, parent)?;
        Ok(parent.id().clone())
    }

    pub fn remove_dependant(&mut self, parent: &str) -> Result<()> {
        self.tree.remove_dependant(&self.id, parent)
    }

    pub fn dependencies(&self, recursive: bool) -> Result<Vec<&FileNode>> {
        self.tree.dependencies_of(&self.id, recursive)
    }

    pub fn dependants(&self, recursive: bool) -> Result<Vec<&FileNode>> {
        self.tree.dependants_of(&self.id, recursive)
    }

    pub fn dirty(&mut self) -> Result<()> {
        self.with_node(FileNode::dirty)
    }

    pub fn set_file_type(&mut self, file_type: &str) -> Result<()> {
        self.with_node(|node| node.set_file_type(file_type))
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<()> {
        let contents = contents.into();
        self.with_node(|node| node.set_contents(contents))
    }

    pub fn set_analyzed(&mut self, analyzed: bool) -> Result<()> {
        self.with_node(|node| node.set_analyzed(analyzed))
    }

    fn with_node(&mut self, f: impl FnOnce(&mut FileNode)) -> Result<()> {
        let node = self
            .tree
            .file_mut(&self.id)
            .ok_or_else(|| GraphError::not_found(&self.id))?;
        f(node);
        Ok(())
    }
}
