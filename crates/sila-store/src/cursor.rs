use std::marker::PhantomData;

use sila_types::Document;

use crate::documents::Documents;
use crate::error::StoreResult;
use crate::filter::Filter;
use crate::traits::FindOptions;

/// Batched iteration over the matches of a query.
///
/// Each call to [`next_batch`](Self::next_batch) issues one `find` with a
/// skip/limit window. The cursor holds no server-side state, so documents
/// inserted or removed between batches may shift the window.
pub struct Cursor<T> {
    documents: Documents,
    filter: Filter,
    batch_size: usize,
    offset: usize,
    exhausted: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Cursor<T> {
    pub(crate) fn new(documents: Documents, filter: Filter, batch_size: usize) -> Self {
        Self {
            documents,
            filter,
            batch_size: batch_size.max(1),
            offset: 0,
            exhausted: false,
            _marker: PhantomData,
        }
    }

    /// Fetch the next batch. Returns `None` once every match has been read.
    pub async fn next_batch(&mut self) -> StoreResult<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }
        let batch: Vec<T> = self
            .documents
            .find(&self.filter, FindOptions::batch(self.offset, self.batch_size))
            .await?;

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }
        if batch.is_empty() {
            return Ok(None);
        }
        self.offset += batch.len();
        Ok(Some(batch))
    }

    /// Number of documents returned so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
