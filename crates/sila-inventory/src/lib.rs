//! High-level API for the Sila inventory.
//!
//! [`Inventory`] is the entry point for applications. It creates, reads,
//! lists, re-parents, and deletes assemblies and parts by composing the
//! document store and the hierarchy engine.

pub mod error;
pub mod filters;
pub mod inventory;

pub use error::{InventoryError, InventoryResult};
pub use filters::{AssemblyFilter, NewPart, PartFilter};
pub use inventory::Inventory;

// Re-export key types
pub use sila_hierarchy::{DescendantOptions, HierarchyConfig};
pub use sila_types::{Assembly, AssemblyOrPart, NodeId, NodeKind, Part};
