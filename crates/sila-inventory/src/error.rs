use sila_hierarchy::HierarchyError;
use sila_store::StoreError;
use sila_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Please specify true for only one of {first} or {second}.")]
    InvalidFilterCombination {
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid input: {0}")]
    Type(#[from] TypeError),

    #[error("hierarchy error: {0}")]
    Hierarchy(HierarchyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<HierarchyError> for InventoryError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::InvalidFilterCombination { first, second } => {
                Self::InvalidFilterCombination { first, second }
            }
            HierarchyError::Store(e) => Self::Store(e),
            other => Self::Hierarchy(other),
        }
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
