use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::path::ID_FIELD;
use crate::traits::{DocumentStore, FindOptions, UpdateOutcome};
use crate::update::Update;

/// Documents keyed by collection name, in a stable order.
pub type Collections = BTreeMap<String, Vec<Value>>;

/// Per-operation call counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub finds: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

impl StoreStats {
    /// Total number of store calls.
    pub fn total(&self) -> u64 {
        self.finds + self.inserts + self.updates + self.deletes
    }
}

#[derive(Default)]
struct Counters {
    finds: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

#[derive(Clone, Copy)]
enum Call {
    Find,
    Insert,
    Update,
    Delete,
}

/// In-memory document store.
///
/// Intended for tests and embedding. Collections are held behind a `RwLock`
/// and each call takes the lock once, so every call is atomic with respect
/// to the others. Documents are cloned on read and write.
///
/// The store can be switched offline with [`set_available`] to simulate a
/// lost connection, and given an artificial per-call latency with
/// [`set_latency`]. Every call is counted in [`stats`], including calls
/// that fail.
///
/// [`set_available`]: Self::set_available
/// [`set_latency`]: Self::set_latency
/// [`stats`]: Self::stats
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    available: AtomicBool,
    latency: RwLock<Option<Duration>>,
    counters: Counters,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::from_collections(Collections::new())
    }

    /// Create a store pre-populated with `collections`.
    pub fn from_collections(collections: Collections) -> Self {
        Self {
            collections: RwLock::new(collections.into_iter().collect()),
            available: AtomicBool::new(true),
            latency: RwLock::new(None),
            counters: Counters::default(),
        }
    }

    /// Copy of every collection, for snapshots and inspection.
    pub fn export(&self) -> Collections {
        self.collections
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(name, docs)| (name.clone(), docs.clone()))
            .collect()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Returns `true` if no collection holds any document.
    pub fn is_empty(&self) -> bool {
        self.collections
            .read()
            .expect("lock poisoned")
            .values()
            .all(Vec::is_empty)
    }

    /// Replace every collection with `collections`. Counters are kept.
    pub fn restore(&self, collections: Collections) {
        *self.collections.write().expect("lock poisoned") = collections.into_iter().collect();
    }

    /// Take the store offline (`false`) or bring it back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().expect("lock poisoned") = latency;
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            finds: self.counters.finds.load(Ordering::SeqCst),
            inserts: self.counters.inserts.load(Ordering::SeqCst),
            updates: self.counters.updates.load(Ordering::SeqCst),
            deletes: self.counters.deletes.load(Ordering::SeqCst),
        }
    }

    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.finds,
            &self.counters.inserts,
            &self.counters.updates,
            &self.counters.deletes,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    async fn enter(&self, call: Call) -> StoreResult<()> {
        let counter = match call {
            Call::Find => &self.counters.finds,
            Call::Insert => &self.counters.inserts,
            Call::Update => &self.counters.updates,
            Call::Delete => &self.counters.deletes,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        let latency = *self.latency.read().expect("lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn update_matching(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        only_first: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut map = self.collections.write().expect("lock poisoned");
        let Some(docs) = map.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        // Stage every change first so a failure leaves the collection untouched.
        let mut staged = Vec::new();
        let mut outcome = UpdateOutcome::default();
        for (index, doc) in docs.iter().enumerate() {
            if !filter.matches(doc) {
                continue;
            }
            outcome.matched += 1;
            let mut next = doc.clone();
            if update.apply(&mut next)? {
                outcome.modified += 1;
                staged.push((index, next));
            }
            if only_first {
                break;
            }
        }
        for (index, next) in staged {
            docs[index] = next;
        }
        Ok(outcome)
    }
}

fn check_document(collection: &str, document: &Value) -> StoreResult<()> {
    match document.get(ID_FIELD) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(StoreError::MissingId {
            collection: collection.to_string(),
        }),
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Value>> {
        self.enter(Call::Find).await?;
        let map = self.collections.read().expect("lock poisoned");
        let Some(docs) = map.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> StoreResult<()> {
        self.enter(Call::Insert).await?;
        check_document(collection, &document)?;
        let mut map = self.collections.write().expect("lock poisoned");
        map.entry(collection.to_string()).or_default().push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        self.enter(Call::Insert).await?;
        for document in &documents {
            check_document(collection, document)?;
        }
        let mut map = self.collections.write().expect("lock poisoned");
        map.entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        self.enter(Call::Update).await?;
        self.update_matching(collection, filter, update, true)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        self.enter(Call::Update).await?;
        self.update_matching(collection, filter, update, false)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.enter(Call::Delete).await?;
        let mut map = self.collections.write().expect("lock poisoned");
        let Some(docs) = map.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.enter(Call::Delete).await?;
        let mut map = self.collections.write().expect("lock poisoned");
        let Some(docs) = map.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.collections.read().expect("lock poisoned");
        let count: usize = map.values().map(Vec::len).sum();
        f.debug_struct("InMemoryDocumentStore")
            .field("collections", &map.len())
            .field("document_count", &count)
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}
