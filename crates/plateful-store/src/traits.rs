//! The document store contract
//!
//! Every call suspends until the backend round-trip completes. There is no
//! synchronous path.

use crate::document::{Document, FieldUpdate, Fields};
use crate::error::StoreError;
use crate::query::Query;
use async_trait::async_trait;
use serde_json::Value;

/// A collection-oriented document database
///
/// Implementations must make each single-document operation atomic and
/// must make [`Transaction::commit`] all-or-nothing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document. With `merge`, top-level fields are merged into an
    /// existing document; otherwise the document is replaced.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Create a document only if `id` is free.
    ///
    /// # Errors
    /// `StoreError::AlreadyExists` when the ID is taken.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    /// Create a document with a store-assigned ID
    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Apply field updates to one document atomically.
    ///
    /// # Errors
    /// `StoreError::NotFound` when the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Run a query
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Start a multi-document transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Atomically union `values` into an array field
    async fn update_array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.update(collection, id, vec![FieldUpdate::ArrayUnion(field.to_string(), values)])
            .await
    }

    /// Atomically remove `values` from an array field
    async fn update_array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        self.update(collection, id, vec![FieldUpdate::ArrayRemove(field.to_string(), values)])
            .await
    }
}

/// An optimistic multi-document transaction
///
/// Reads record the version they observed. Writes are buffered and become
/// visible only when [`commit`](Transaction::commit) succeeds. All reads
/// must happen before the first write. Dropping an uncommitted transaction
/// discards its writes.
#[async_trait]
pub trait Transaction: Send {
    /// Read a document and remember its version for commit validation
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Buffer a document write
    fn set(
        &mut self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Buffer field updates on an existing document
    fn update(
        &mut self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError>;

    /// Validate reads and apply all buffered writes atomically.
    ///
    /// # Errors
    /// - `StoreError::TransactionConflict` if any document read has changed
    /// - `StoreError::NotFound` if an update targets a missing document
    /// - `StoreError::TransactionClosed` if already committed
    async fn commit(&mut self) -> Result<(), StoreError>;
}
