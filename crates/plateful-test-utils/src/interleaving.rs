//! Store wrapper that yields to the scheduler before every call
//!
//! Two futures joined on one task then alternate at each store call, so
//! both transactions read before either commits.

use async_trait::async_trait;
use plateful_store::{Document, DocumentStore, FieldUpdate, Fields, Query, StoreError, Transaction};
use std::sync::Arc;
use tokio::task::yield_now;

#[derive(Clone)]
pub struct InterleavingStore {
    inner: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for InterleavingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterleavingStore").finish_non_exhaustive()
    }
}

impl InterleavingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for InterleavingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        yield_now().await;
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.set(collection, id, fields, merge).await
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<Document, StoreError> {
        yield_now().await;
        self.inner.create(collection, id, fields).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        yield_now().await;
        self.inner.add(collection, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.update(collection, id, updates).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.delete(collection, id).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        yield_now().await;
        self.inner.query(query).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, StoreError> {
        yield_now().await;
        let inner = self.inner.begin_transaction().await?;
        Ok(Box::new(YieldingTransaction { inner }))
    }
}

struct YieldingTransaction {
    inner: Box<dyn Transaction>,
}

#[async_trait]
impl Transaction for YieldingTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        yield_now().await;
        self.inner.get(collection, id).await
    }

    fn set(
        &mut self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, fields, merge)
    }

    fn update(
        &mut self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, updates)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.commit().await
    }
}
