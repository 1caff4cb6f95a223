//! Document storage for Sila.
//!
//! This crate is the boundary between the inventory logic and a schemaless
//! document store. Records are JSON documents grouped in named collections
//! and addressed by their `id` field.
//!
//! # Layers
//!
//! - [`DocumentStore`] -- the raw backend: filtered find, insert, update by
//!   path, and delete over `serde_json::Value` documents
//! - [`Documents`] -- the typed service: lazy [`Query`] views, typed CRUD,
//!   property setters, and [`Documents::index_of`] over a batched [`Cursor`]
//! - [`Filter`] -- the predicate language a store evaluates
//! - [`FieldPath`], [`UpdateOp`], [`Update`] -- path-addressed mutations,
//!   with [`StackedField`] for atomic multi-field updates
//!
//! # Storage Backends
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileDocumentStore`] -- the in-memory store persisted as a JSON snapshot
//!
//! # Design Rules
//!
//! 1. Each store call is atomic on its own. No call spans another.
//! 2. An update applies to a document completely or not at all.
//! 3. Zero matches is a no-op, never an error.
//! 4. Nothing is retried. Every backend call is bounded by a timeout.

pub mod cursor;
pub mod documents;
pub mod error;
pub mod file;
pub mod filter;
pub mod memory;
pub mod path;
pub mod traits;
pub mod update;

// Re-export primary types at crate root for ergonomic imports.
pub use cursor::Cursor;
pub use documents::{Documents, DocumentsConfig, Query};
pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use filter::Filter;
pub use memory::{Collections, InMemoryDocumentStore, StoreStats};
pub use path::FieldPath;
pub use traits::{DocumentStore, FindOptions, UpdateOutcome};
pub use update::{StackedField, Update, UpdateOp};
