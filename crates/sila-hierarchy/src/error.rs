//! Error types for hierarchy operations.

use sila_store::StoreError;
use sila_types::NodeId;

/// Errors that can occur during hierarchy operations.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// Two mutually exclusive options were requested together.
    #[error("Please specify true for only one of {first} or {second}.")]
    InvalidFilterCombination {
        first: &'static str,
        second: &'static str,
    },

    /// The requested parent is not an existing assembly.
    #[error("parent assembly not found: {0}")]
    ParentNotFound(NodeId),

    /// An assembly cannot contain itself.
    #[error("assembly {0} cannot be its own parent")]
    SelfParent(NodeId),

    /// The new parent is a descendant of the node being moved.
    #[error("moving {node} under {parent} would create a cycle")]
    CycleDetected {
        /// The node being re-parented.
        node: NodeId,
        /// The requested parent.
        parent: NodeId,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HierarchyError {
    /// Returns `true` for failures caused by the shape of the tree rather
    /// than by the store or the caller's flags.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::ParentNotFound(_) | Self::SelfParent(_) | Self::CycleDetected { .. }
        )
    }
}

/// Convenience alias for hierarchy results.
pub type HierarchyResult<T> = Result<T, HierarchyError>;
