use serde::{Deserialize, Serialize};
use sila_store::{FieldPath, Filter};
use sila_types::fields;

use crate::error::{InventoryError, InventoryResult};

/// Restricts an assembly listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblyFilter {
    /// Only assemblies without a parent.
    pub top_level_only: bool,
    /// Only assemblies inside another assembly.
    pub sub_assemblies_only: bool,
}

impl AssemblyFilter {
    pub fn to_filter(&self) -> InventoryResult<Filter> {
        parent_filter(
            self.top_level_only,
            self.sub_assemblies_only,
            ("topLevelOnly", "subAssembliesOnly"),
        )
    }
}

/// Restricts a part listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartFilter {
    /// Only parts inside an assembly.
    pub component_parts_only: bool,
    /// Only parts without a parent.
    pub orphan_parts_only: bool,
}

impl PartFilter {
    pub fn to_filter(&self) -> InventoryResult<Filter> {
        parent_filter(
            self.orphan_parts_only,
            self.component_parts_only,
            ("componentPartsOnly", "orphanPartsOnly"),
        )
    }
}

fn parent_filter(
    roots_only: bool,
    nested_only: bool,
    (first, second): (&'static str, &'static str),
) -> InventoryResult<Filter> {
    let parent = FieldPath::parse(fields::PARENT_ID)?;
    match (roots_only, nested_only) {
        (true, true) => Err(InventoryError::InvalidFilterCombination { first, second }),
        (true, false) => Ok(Filter::is_null(parent)),
        (false, true) => Ok(Filter::not_null(parent)),
        (false, false) => Ok(Filter::All),
    }
}

/// Fields supplied when creating a part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPart {
    pub name: String,
    pub color: Option<String>,
    pub material: Option<String>,
}

impl NewPart {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
