//! Store wrapper that fails chosen operations

use async_trait::async_trait;
use dashmap::DashMap;
use plateful_store::{
    Document, DocumentStore, FieldUpdate, Fields, FilterOp, Query, StoreError, Transaction,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which calls to fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `add` into a collection
    Add(String),
    /// `get` of one document
    Get(String, String),
    /// `query` on a collection with an equality filter `field == value`
    QueryWhere(String, String, String),
}

/// Delegates to an inner store unless a fault matches
#[derive(Clone)]
pub struct FaultyStore {
    inner: Arc<dyn DocumentStore>,
    faults: Arc<DashMap<Fault, StoreError>>,
    gets: Arc<AtomicU64>,
}

impl std::fmt::Debug for FaultyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyStore")
            .field("faults", &self.faults.len())
            .finish_non_exhaustive()
    }
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            faults: Arc::new(DashMap::new()),
            gets: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inject(&self, fault: Fault, error: StoreError) {
        self.faults.insert(fault, error);
    }

    pub fn fail_adds(&self, collection: &str) {
        self.inject(
            Fault::Add(collection.into()),
            StoreError::Network("injected add failure".into()),
        );
    }

    pub fn fail_get(&self, collection: &str, id: &str) {
        self.inject(
            Fault::Get(collection.into(), id.into()),
            StoreError::Network("injected get failure".into()),
        );
    }

    pub fn fail_query_where(&self, collection: &str, field: &str, value: &str) {
        self.inject(
            Fault::QueryWhere(collection.into(), field.into(), value.into()),
            StoreError::Network("injected query failure".into()),
        );
    }

    pub fn heal(&self) {
        self.faults.clear();
    }

    /// Number of single-document `get` calls seen
    pub fn get_calls(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    fn check(&self, fault: &Fault) -> Result<(), StoreError> {
        match self.faults.get(fault) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check(&Fault::Get(collection.into(), id.into()))?;
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.inner.set(collection, id, fields, merge).await
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<Document, StoreError> {
        self.inner.create(collection, id, fields).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        self.check(&Fault::Add(collection.into()))?;
        self.inner.add(collection, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, updates).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        for filter in query.filters.iter().filter(|f| f.op == FilterOp::Eq) {
            if let Value::String(value) = &filter.value {
                self.check(&Fault::QueryWhere(
                    query.collection.clone(),
                    filter.field.clone(),
                    value.clone(),
                ))?;
            }
        }
        self.inner.query(query).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, StoreError> {
        self.inner.begin_transaction().await
    }
}
