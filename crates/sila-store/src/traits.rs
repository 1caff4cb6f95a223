use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::update::Update;

/// Window over the matches of a `find`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Number of leading matches to skip.
    pub skip: usize,
    /// Maximum number of documents to return. `None` returns all.
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn batch(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }

    pub fn first() -> Self {
        Self::batch(0, 1)
    }
}

/// Result of an update call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents that matched the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// Schemaless document store holding JSON documents in named collections.
///
/// All implementations must satisfy these invariants:
/// - Each call is atomic with respect to other calls. Nothing spans calls.
/// - `find` returns matches in store iteration order, which is insertion
///   order for the bundled backends.
/// - An update applies to a matched document completely or not at all.
/// - Zero matches is never an error for updates and deletes.
/// - Transport failures surface as `Unavailable`; nothing is retried.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the documents in `collection` matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Value>>;

    /// Insert a document. It must carry a string `id` field.
    async fn insert_one(&self, collection: &str, document: Value) -> StoreResult<()>;

    /// Insert several documents.
    ///
    /// Default implementation calls `insert_one()` for each document and
    /// stops at the first failure.
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        for document in documents {
            self.insert_one(collection, document).await?;
        }
        Ok(())
    }

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome>;

    /// Apply `update` to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome>;

    /// Delete the first document matching `filter`. Returns the count removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Delete every document matching `filter`. Returns the count removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;
}
