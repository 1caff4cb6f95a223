//! Foundation types for Sila.
//!
//! This crate provides the inventory data model shared by every other Sila
//! crate: identifiers, the two node kinds, and the record types stored as
//! documents.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Opaque node identifier (UUID v7 for fresh ids)
//! - [`NodeKind`] -- Assembly or Part; each kind has its own collection
//! - [`Assembly`] -- Composite node that may contain parts and assemblies
//! - [`Part`] -- Leaf node with optional color and material
//! - [`AssemblyOrPart`] -- Tagged union used for flattened descendant lists
//! - [`Document`] -- Anything that can be stored in a document collection

pub mod document;
pub mod error;
pub mod id;
pub mod node;

pub use document::Document;
pub use error::TypeError;
pub use id::NodeId;
pub use node::{fields, Assembly, AssemblyOrPart, Node, NodeKind, Part};
