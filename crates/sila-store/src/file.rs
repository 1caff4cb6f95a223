use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::memory::{Collections, InMemoryDocumentStore};
use crate::traits::{DocumentStore, FindOptions, UpdateOutcome};
use crate::update::Update;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    collections: Collections,
}

/// Document store persisted as a single JSON snapshot file.
///
/// Reads are served from memory. Every call that changes a document
/// rewrites the whole snapshot through a temporary file in the same
/// directory followed by a rename, so the file on disk is always a complete
/// snapshot. Mutations are serialized, and one that cannot be written is
/// rolled back in memory before its error is returned. Each write copies
/// every collection, which suits small inventories and low write rates.
pub struct FileDocumentStore {
    path: PathBuf,
    inner: InMemoryDocumentStore,
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Open the snapshot at `path`, or start empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let collections = if path.exists() {
            let bytes = fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(StoreError::Serialization(format!(
                    "{}: unsupported snapshot version {}",
                    path.display(),
                    snapshot.version
                )));
            }
            snapshot.collections
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Collections::new()
        };

        info!(path = %path.display(), collections = collections.len(), "opened document snapshot");
        Ok(Self {
            path,
            inner: InMemoryDocumentStore::from_collections(collections),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory state backing this store.
    pub fn inner(&self) -> &InMemoryDocumentStore {
        &self.inner
    }

    /// Write the current state, or put `before` back if the write fails.
    /// Callers hold `write_lock` from before `before` was taken.
    async fn persist_or_restore(&self, before: Collections) -> StoreResult<()> {
        if let Err(err) = self.persist().await {
            warn!(path = %self.path.display(), error = %err, "snapshot write failed, change rolled back");
            self.inner.restore(before);
            return Err(err);
        }
        Ok(())
    }

    async fn persist(&self) -> StoreResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            collections: self.inner.export(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let len = bytes.len();

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        debug!(path = %self.path.display(), bytes = len, "snapshot written");
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Value>> {
        self.inner.find(collection, filter, options).await
    }

    async fn insert_one(&self, collection: &str, document: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        self.inner.insert_one(collection, document).await?;
        self.persist_or_restore(before).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        self.inner.insert_many(collection, documents).await?;
        self.persist_or_restore(before).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        let outcome = self.inner.update_one(collection, filter, update).await?;
        if outcome.modified > 0 {
            self.persist_or_restore(before).await?;
        }
        Ok(outcome)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        let outcome = self.inner.update_many(collection, filter, update).await?;
        if outcome.modified > 0 {
            self.persist_or_restore(before).await?;
        }
        Ok(outcome)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        let removed = self.inner.delete_one(collection, filter).await?;
        if removed > 0 {
            self.persist_or_restore(before).await?;
        }
        Ok(removed)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.export();
        let removed = self.inner.delete_many(collection, filter).await?;
        if removed > 0 {
            self.persist_or_restore(before).await?;
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for FileDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocumentStore")
            .field("path", &self.path)
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use crate::update::UpdateOp;
    use serde_json::json;

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");

        {
            let store = FileDocumentStore::open(&path).unwrap();
            store
                .insert_one("Assembly", json!({ "id": "A1", "name": "Chassis" }))
                .await
                .unwrap();
            store
                .insert_one("Part", json!({ "id": "P1", "name": "Bolt" }))
                .await
                .unwrap();
            let update =
                Update::single(UpdateOp::set(FieldPath::parse("parentId").unwrap(), "A1")).unwrap();
            store
                .update_one("Part", &Filter::by_id("P1"), &update)
                .await
                .unwrap();
        }

        let reopened = FileDocumentStore::open(&path).unwrap();
        let parts = reopened
            .find("Part", &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(parts, vec![json!({ "id": "P1", "name": "Bolt", "parentId": "A1" })]);
        assert_eq!(reopened.inner().len("Assembly"), 1);
    }

    #[tokio::test]
    async fn deletes_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = FileDocumentStore::open(&path).unwrap();
        store
            .insert_many("Part", vec![json!({ "id": "P1" }), json!({ "id": "P2" })])
            .await
            .unwrap();
        assert_eq!(store.delete_one("Part", &Filter::by_id("P1")).await.unwrap(), 1);

        let reopened = FileDocumentStore::open(&path).unwrap();
        assert_eq!(reopened.inner().len("Part"), 1);
    }

    #[tokio::test]
    async fn failed_snapshot_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = FileDocumentStore::open(&path).unwrap();
        store
            .insert_one("Part", json!({ "id": "P1", "name": "Bolt" }))
            .await
            .unwrap();

        // A non-empty directory where the snapshot lives makes the rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let err = store
            .insert_one("Part", json!({ "id": "P2" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.inner().len("Part"), 1);

        let update =
            Update::single(UpdateOp::set(FieldPath::parse("color").unwrap(), "black")).unwrap();
        assert!(store
            .update_one("Part", &Filter::by_id("P1"), &update)
            .await
            .is_err());
        assert!(store
            .delete_many("Part", &Filter::All)
            .await
            .is_err());
        let parts = store
            .find("Part", &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(parts, vec![json!({ "id": "P1", "name": "Bolt" })]);

        fs::remove_dir_all(&path).unwrap();
        store.insert_one("Part", json!({ "id": "P3" })).await.unwrap();
        let reopened = FileDocumentStore::open(&path).unwrap();
        assert_eq!(reopened.inner().len("Part"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_all_reach_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = std::sync::Arc::new(FileDocumentStore::open(&path).unwrap());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .insert_one("Part", json!({ "id": format!("P{i}") }))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reopened = FileDocumentStore::open(&path).unwrap();
        assert_eq!(reopened.inner().len("Part"), 16);
    }

    #[tokio::test]
    async fn no_op_mutations_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = FileDocumentStore::open(&path).unwrap();
        assert_eq!(store.delete_one("Part", &Filter::by_id("P1")).await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_opens_empty_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        let store = FileDocumentStore::open(&path).unwrap();
        assert!(store.inner().is_empty());
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, b"not json").unwrap();
        let err = FileDocumentStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));

        fs::write(&path, br#"{ "version": 9, "collections": {} }"#).unwrap();
        assert!(FileDocumentStore::open(&path).is_err());
    }
}
