//! Tree operations over the Sila inventory forest.
//!
//! Assemblies contain parts and other assemblies through the `parentId`
//! field of each child. This crate resolves ancestor chains, enumerates
//! descendants, re-parents nodes, and deletes nodes while orphaning their
//! children.
//!
//! Every traversal keeps a visited set, so malformed data containing a
//! parent cycle terminates with a warning instead of looping.

pub mod error;
pub mod hierarchy;
pub mod options;

pub use error::{HierarchyError, HierarchyResult};
pub use hierarchy::Hierarchy;
pub use options::{DescendantOptions, HierarchyConfig};
