//! Grove - command-line front end for the grove-core dependency tree
//!
//! The tree lives in a JSON snapshot under the repository root; every
//! command loads it, works on it, and writes it back.

pub mod cache;
pub mod commands;
pub mod config;

pub use commands::Workspace;
pub use config::Config;
