//! Grove Core - Dependency graph for incremental builds
//!
//! Tracks the files of a build, which files depend on which, and derives
//! processing orders and subsets from that graph. No I/O happens here;
//! analyzers feed the tree and build phases query it.
//!
//! ```
//! use grove_core::{DependencyTree, Order};
//!
//! let mut tree = DependencyTree::new();
//! tree.add_file("/src/index.js", true);
//! tree.add_dependency("/src/index.js", "/src/util.js").unwrap();
//!
//! let order = tree.file_ids(Order::Topological).unwrap();
//! assert_eq!(order[0].as_str(), "/src/util.js");
//! ```

pub mod diff;
pub mod error;
pub mod file;
pub mod options;
pub mod props;
pub mod snapshot;
pub mod store;
pub mod tree;


#[cfg(test)]
pub mod test_utils;

pub use diff::TreeDiff;
pub use error::{GraphError, Result};
pub use file::{FileId, FileMut, FileNode, FileParams, TreeId};
pub use options::{IdStrategy, TreeOptions};
pub use props::{Extensions, PropValue};
pub use snapshot::{FileRecord, TreeSnapshot};
pub use store::GraphStore;
pub use tree::{CycleBreakReport, DependencyTree, Order, TreeStats};
