use serde::{Deserialize, Serialize};

use crate::error::{HierarchyError, HierarchyResult};

/// Shape of a descendant listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DescendantOptions {
    /// Only direct children, both parts and assemblies.
    pub first_level_only: bool,
    /// Only parts, from every level.
    pub leaves_only: bool,
}

impl DescendantOptions {
    /// Every descendant at every level.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first_level() -> Self {
        Self {
            first_level_only: true,
            leaves_only: false,
        }
    }

    pub fn leaves() -> Self {
        Self {
            first_level_only: false,
            leaves_only: true,
        }
    }

    /// Reject flag combinations that cannot both hold.
    pub fn validate(&self) -> HierarchyResult<()> {
        if self.first_level_only && self.leaves_only {
            return Err(HierarchyError::InvalidFilterCombination {
                first: "firstLevelOnly",
                second: "componentPartsOnly",
            });
        }
        Ok(())
    }
}

/// Hierarchy engine settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Check existence and acyclicity before re-parenting. Off by default,
    /// in which case any id is written as given.
    pub enforce_parent_integrity: bool,
}
