//! Typed document service over a [`DocumentStore`].
//!
//! [`Documents`] is what the upper layers talk to. It serializes typed
//! records, builds path updates, and bounds every backend call with the
//! configured operation timeout.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sila_types::Document;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::path::FieldPath;
use crate::traits::{DocumentStore, FindOptions, UpdateOutcome};
use crate::update::{StackedField, Update, UpdateOp};

/// Tuning for [`Documents`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentsConfig {
    /// Upper bound on each backend call.
    pub operation_timeout: Duration,
    /// Batch size used by [`Documents::index_of`].
    pub batch_size: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
            batch_size: 100,
        }
    }
}

/// Typed access to the collections of one store.
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
    config: DocumentsConfig,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, DocumentsConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: DocumentsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DocumentsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn guard<R>(&self, call: impl Future<Output = StoreResult<R>>) -> StoreResult<R> {
        let timeout = self.config.operation_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }

    /// A lazy query over every document of `T`'s collection.
    pub fn query<T: Document>(&self) -> Query<T> {
        Query {
            documents: self.clone(),
            filter: Filter::All,
            _marker: PhantomData,
        }
    }

    /// Fetch and decode the documents of `T` matching `filter`.
    pub async fn find<T: Document>(
        &self,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<T>> {
        debug!(collection = T::COLLECTION, %filter, ?options, "find");
        let raw = self
            .guard(self.store.find(T::COLLECTION, filter, options))
            .await?;
        raw.into_iter().map(decode).collect()
    }

    pub async fn find_by_id<T: Document>(&self, id: &str) -> StoreResult<Option<T>> {
        self.query::<T>().filter(Filter::by_id(id)).first().await
    }

    pub async fn insert_document<T: Document>(&self, document: &T) -> StoreResult<()> {
        debug!(collection = T::COLLECTION, id = document.id(), "insert");
        let value = encode(document)?;
        self.guard(self.store.insert_one(T::COLLECTION, value)).await
    }

    pub async fn insert_documents<T: Document>(&self, documents: &[T]) -> StoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        debug!(collection = T::COLLECTION, count = documents.len(), "insert many");
        let values = documents.iter().map(encode).collect::<StoreResult<Vec<_>>>()?;
        self.guard(self.store.insert_many(T::COLLECTION, values)).await
    }

    /// Apply `update` to the first document matching `filter`.
    ///
    /// An empty update returns immediately without calling the store.
    pub async fn update_document<T: Document>(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        if update.is_empty() {
            return Ok(UpdateOutcome::default());
        }
        debug!(collection = T::COLLECTION, %filter, %update, "update one");
        self.guard(self.store.update_one(T::COLLECTION, filter, update))
            .await
    }

    /// Apply `update` to every document matching `filter`.
    pub async fn update_documents<T: Document>(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        if update.is_empty() {
            return Ok(UpdateOutcome::default());
        }
        debug!(collection = T::COLLECTION, %filter, %update, "update many");
        self.guard(self.store.update_many(T::COLLECTION, filter, update))
            .await
    }

    pub async fn remove_document<T: Document>(&self, filter: &Filter) -> StoreResult<u64> {
        debug!(collection = T::COLLECTION, %filter, "delete one");
        self.guard(self.store.delete_one(T::COLLECTION, filter)).await
    }

    pub async fn remove_documents<T: Document>(&self, filter: &Filter) -> StoreResult<u64> {
        debug!(collection = T::COLLECTION, %filter, "delete many");
        self.guard(self.store.delete_many(T::COLLECTION, filter)).await
    }

    /// Set `property` (under `prefix`, or at the root when `None`) on the
    /// first match.
    pub async fn set_property<T: Document>(
        &self,
        filter: &Filter,
        prefix: Option<&str>,
        property: &str,
        value: impl Into<Value>,
    ) -> StoreResult<UpdateOutcome> {
        let path = FieldPath::join(prefix, property)?;
        let update = Update::single(UpdateOp::set(path, value))?;
        self.update_document::<T>(filter, &update).await
    }

    /// Set `property` on every match.
    pub async fn set_property_many<T: Document>(
        &self,
        filter: &Filter,
        prefix: Option<&str>,
        property: &str,
        value: impl Into<Value>,
    ) -> StoreResult<UpdateOutcome> {
        let path = FieldPath::join(prefix, property)?;
        let update = Update::single(UpdateOp::set(path, value))?;
        self.update_documents::<T>(filter, &update).await
    }

    /// Set several properties of the first match in one store call.
    ///
    /// Repeated paths keep the last value. No fields means no store call.
    pub async fn set_properties<T: Document>(
        &self,
        filter: &Filter,
        fields: impl IntoIterator<Item = StackedField>,
    ) -> StoreResult<UpdateOutcome> {
        let update = Update::stacked(fields)?;
        self.update_document::<T>(filter, &update).await
    }

    pub async fn unset_property<T: Document>(
        &self,
        filter: &Filter,
        prefix: Option<&str>,
        property: &str,
    ) -> StoreResult<UpdateOutcome> {
        let path = FieldPath::join(prefix, property)?;
        let update = Update::single(UpdateOp::unset(path))?;
        self.update_document::<T>(filter, &update).await
    }

    pub async fn unset_property_many<T: Document>(
        &self,
        filter: &Filter,
        prefix: Option<&str>,
        property: &str,
    ) -> StoreResult<UpdateOutcome> {
        let path = FieldPath::join(prefix, property)?;
        let update = Update::single(UpdateOp::unset(path))?;
        self.update_documents::<T>(filter, &update).await
    }

    /// Add `item` to the array at `path` on the first match, unless an equal
    /// element is already there.
    pub async fn add_item_to_set<T: Document>(
        &self,
        filter: &Filter,
        path: &str,
        item: impl Into<Value>,
    ) -> StoreResult<UpdateOutcome> {
        let update = Update::single(UpdateOp::add_to_set(FieldPath::parse(path)?, item))?;
        self.update_document::<T>(filter, &update).await
    }

    /// Zero-based position of the first element of `query` satisfying
    /// `predicate`.
    ///
    /// Scans the query in batches of `batch_size`. This is linear in the
    /// position of the match and is meant for occasional lookups.
    pub async fn index_of<T: Document>(
        &self,
        query: &Query<T>,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> StoreResult<Option<usize>> {
        let mut cursor = query.cursor(self.config.batch_size);
        let mut index = 0;
        while let Some(batch) = cursor.next_batch().await? {
            for item in &batch {
                if predicate(item) {
                    return Ok(Some(index));
                }
                index += 1;
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for Documents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Documents")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn encode<T: Document>(document: &T) -> StoreResult<Value> {
    serde_json::to_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: Document>(value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// A lazy, composable view over one collection.
///
/// Building and refining a query never touches the store. Only
/// [`to_list`](Self::to_list), [`first`](Self::first), and
/// [`cursor`](Self::cursor) read.
pub struct Query<T> {
    documents: Documents,
    filter: Filter,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            documents: self.documents.clone(),
            filter: self.filter.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Query<T> {
    /// Narrow the query with another clause.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).and(filter);
        self
    }

    pub fn current_filter(&self) -> &Filter {
        &self.filter
    }

    /// Every match, in store order.
    pub async fn to_list(&self) -> StoreResult<Vec<T>> {
        self.documents
            .find(&self.filter, FindOptions::default())
            .await
    }

    pub async fn first(&self) -> StoreResult<Option<T>> {
        let mut found = self
            .documents
            .find(&self.filter, FindOptions::first())
            .await?;
        Ok(found.pop())
    }

    pub fn cursor(&self, batch_size: usize) -> Cursor<T> {
        Cursor::new(self.documents.clone(), self.filter.clone(), batch_size)
    }
}

impl<T: Document> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("collection", &T::COLLECTION)
            .field("filter", &self.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::memory::InMemoryDocumentStore;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Widget {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    }

    impl Document for Widget {
        const COLLECTION: &'static str = "Widget";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn widget(id: &str, name: &str) -> Widget {
        Widget {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            tags: Vec::new(),
        }
    }

    fn parent() -> FieldPath {
        FieldPath::parse("parentId").unwrap()
    }

    async fn setup(widgets: &[Widget]) -> (Arc<InMemoryDocumentStore>, Documents) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let documents = Documents::new(store.clone());
        documents.insert_documents(widgets).await.unwrap();
        store.reset_stats();
        (store, documents)
    }

    fn raw(store: &InMemoryDocumentStore) -> Vec<Value> {
        store.export().remove(Widget::COLLECTION).unwrap_or_default()
    }

    #[tokio::test]
    async fn queries_are_lazy() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        let query = documents
            .query::<Widget>()
            .filter(Filter::is_null(parent()))
            .filter(Filter::by_id("w1"));
        assert_eq!(store.stats().total(), 0);

        let list = query.to_list().await.unwrap();
        assert_eq!(list, vec![widget("w1", "Bolt")]);
        assert_eq!(store.stats().finds, 1);
    }

    #[tokio::test]
    async fn find_by_id_absent_is_none() {
        let (_store, documents) = setup(&[widget("w1", "Bolt")]).await;
        assert!(documents.find_by_id::<Widget>("nope").await.unwrap().is_none());
        assert_eq!(
            documents.find_by_id::<Widget>("w1").await.unwrap().unwrap().name,
            "Bolt"
        );
    }

    #[tokio::test]
    async fn set_and_unset_property() {
        let (store, documents) = setup(&[widget("w1", "Bolt"), widget("w2", "Nut")]).await;
        documents
            .set_property::<Widget>(&Filter::by_id("w1"), None, "parentId", "A1")
            .await
            .unwrap();
        assert_eq!(raw(&store)[0]["parentId"], "A1");

        documents
            .unset_property::<Widget>(&Filter::by_id("w1"), None, "parentId")
            .await
            .unwrap();
        assert!(raw(&store)[0].get("parentId").is_none());
    }

    #[tokio::test]
    async fn nested_property_under_prefix() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        documents
            .set_property::<Widget>(&Filter::by_id("w1"), Some("specs.thread"), "pitch", 1.25)
            .await
            .unwrap();
        assert_eq!(raw(&store)[0]["specs"]["thread"]["pitch"], json!(1.25));
    }

    #[tokio::test]
    async fn set_property_many_touches_all_matches() {
        let (store, documents) = setup(&[widget("w1", "Bolt"), widget("w2", "Nut")]).await;
        let outcome = documents
            .set_property_many::<Widget>(&Filter::All, None, "color", "red")
            .await
            .unwrap();
        assert_eq!(outcome.modified, 2);
        assert!(raw(&store).iter().all(|d| d["color"] == "red"));

        documents
            .unset_property_many::<Widget>(&Filter::All, None, "color")
            .await
            .unwrap();
        assert!(raw(&store).iter().all(|d| d.get("color").is_none()));
    }

    #[tokio::test]
    async fn stacked_properties_use_one_update_call() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        documents
            .set_properties::<Widget>(
                &Filter::by_id("w1"),
                vec![
                    StackedField::root("color", "red"),
                    StackedField::root("material", "steel"),
                    StackedField::new(Some("dimensions"), "length", 40),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.stats().updates, 1);

        let doc = &raw(&store)[0];
        assert_eq!(doc["color"], "red");
        assert_eq!(doc["material"], "steel");
        assert_eq!(doc["dimensions"]["length"], 40);
    }

    #[tokio::test]
    async fn stacked_last_write_wins() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        documents
            .set_properties::<Widget>(
                &Filter::by_id("w1"),
                vec![
                    StackedField::root("color", "red"),
                    StackedField::root("color", "blue"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(raw(&store)[0]["color"], "blue");
    }

    #[tokio::test]
    async fn empty_stack_makes_no_store_call() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        let before = raw(&store);
        let outcome = documents
            .set_properties::<Widget>(&Filter::by_id("w1"), Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(store.stats().total(), 0);
        assert_eq!(raw(&store), before);
    }

    #[tokio::test]
    async fn empty_stack_succeeds_even_when_offline() {
        let (store, documents) = setup(&[]).await;
        store.set_available(false);
        assert!(documents
            .set_properties::<Widget>(&Filter::All, Vec::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn add_item_to_set_keeps_elements_unique() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        for tag in ["m6", "steel", "m6"] {
            documents
                .add_item_to_set::<Widget>(&Filter::by_id("w1"), "tags", tag)
                .await
                .unwrap();
        }
        let w = documents.find_by_id::<Widget>("w1").await.unwrap().unwrap();
        assert_eq!(w.tags, ["m6", "steel"]);
        assert_eq!(store.stats().updates, 3);
    }

    #[tokio::test]
    async fn remove_one_and_many() {
        let (_store, documents) =
            setup(&[widget("w1", "Bolt"), widget("w2", "Nut"), widget("w3", "Nut")]).await;
        let name = FieldPath::parse("name").unwrap();
        assert_eq!(
            documents
                .remove_document::<Widget>(&Filter::eq(name, "Nut"))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            documents
                .remove_documents::<Widget>(&Filter::All)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn index_of_spans_batches() {
        let widgets: Vec<Widget> = (0..7).map(|i| widget(&format!("w{i}"), "x")).collect();
        let store = Arc::new(InMemoryDocumentStore::new());
        let documents = Documents::with_config(
            store.clone(),
            DocumentsConfig {
                batch_size: 3,
                ..DocumentsConfig::default()
            },
        );
        documents.insert_documents(&widgets).await.unwrap();

        let query = documents.query::<Widget>();
        assert_eq!(
            documents.index_of(&query, |w| w.id == "w5").await.unwrap(),
            Some(5)
        );
        assert_eq!(
            documents.index_of(&query, |w| w.id == "w0").await.unwrap(),
            Some(0)
        );
        assert_eq!(documents.index_of(&query, |w| w.id == "zz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn index_of_counts_within_filtered_query() {
        let mut a = widget("w1", "a");
        a.parent_id = Some("A1".into());
        let mut b = widget("w3", "b");
        b.parent_id = Some("A1".into());
        let (_store, documents) = setup(&[a, widget("w2", "root"), b]).await;

        let children = documents
            .query::<Widget>()
            .filter(Filter::eq(parent(), "A1"));
        assert_eq!(
            documents.index_of(&children, |w| w.id == "w3").await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn offline_store_surfaces_unavailable() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        store.set_available(false);
        let err = documents.query::<Widget>().to_list().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let (store, _) = setup(&[widget("w1", "Bolt")]).await;
        let documents = Documents::with_config(
            store.clone(),
            DocumentsConfig {
                operation_timeout: Duration::from_millis(20),
                ..DocumentsConfig::default()
            },
        );
        store.set_latency(Some(Duration::from_millis(500)));
        let err = documents
            .set_property::<Widget>(&Filter::by_id("w1"), None, "name", "X")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[tokio::test]
    async fn invalid_property_path_makes_no_call() {
        let (store, documents) = setup(&[widget("w1", "Bolt")]).await;
        let err = documents
            .set_property::<Widget>(&Filter::by_id("w1"), Some("a..b"), "c", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert_eq!(store.stats().total(), 0);
    }

    #[tokio::test]
    async fn undecodable_document_is_serialization_error() {
        let (store, documents) = setup(&[]).await;
        store
            .insert_one(Widget::COLLECTION, json!({ "id": "w1" }))
            .await
            .unwrap();
        let err = documents.query::<Widget>().to_list().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
