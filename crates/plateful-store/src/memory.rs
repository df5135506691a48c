//! In-memory reference store
//!
//! Implements the full [`DocumentStore`] contract including optimistic
//! transactions. Used by tests and the simulator.

use crate::document::{merge_fields, Document, FieldUpdate, Fields};
use crate::error::{document_path, StoreError};
use crate::query::Query;
use crate::traits::{DocumentStore, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use ulid::Ulid;

#[derive(Debug, Clone)]
struct StoredDoc {
    fields: Fields,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    version: u64,
}

impl StoredDoc {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_string(),
            fields: self.fields.clone(),
            create_time: self.create_time,
            update_time: self.update_time,
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, StoredDoc>>,
    last_time: Option<DateTime<Utc>>,
    /// Global write counter; versions never repeat, even across delete/recreate
    version_counter: u64,
}

impl Inner {
    /// Strictly increasing server clock
    fn next_time(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_time {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_time = Some(now);
        now
    }

    fn next_version(&mut self) -> u64 {
        self.version_counter += 1;
        self.version_counter
    }

    fn lookup(&self, collection: &str, id: &str) -> Option<&StoredDoc> {
        self.collections.get(collection).and_then(|c| c.get(id))
    }

    fn version_of(&self, collection: &str, id: &str) -> Option<u64> {
        self.lookup(collection, id).map(|d| d.version)
    }

    fn write(&mut self, collection: &str, id: &str, write: &PendingWrite) -> Result<(), StoreError> {
        let now = self.next_time();
        let version = self.next_version();
        let docs = self.collections.entry(collection.to_string()).or_default();

        match write {
            PendingWrite::Set { fields, merge, .. } => match docs.get_mut(id) {
                Some(existing) => {
                    if *merge {
                        merge_fields(&mut existing.fields, fields.clone());
                    } else {
                        existing.fields = fields.clone();
                    }
                    existing.update_time = now;
                    existing.version = version;
                }
                None => {
                    docs.insert(
                        id.to_string(),
                        StoredDoc {
                            fields: fields.clone(),
                            create_time: now,
                            update_time: now,
                            version,
                        },
                    );
                }
            },
            PendingWrite::Update { updates, .. } => {
                let existing = docs
                    .get_mut(id)
                    .ok_or_else(|| StoreError::not_found(collection, id))?;
                for update in updates {
                    update.apply(&mut existing.fields);
                }
                existing.update_time = now;
                existing.version = version;
            }
        }
        Ok(())
    }
}

/// A buffered transactional write
#[derive(Debug, Clone)]
enum PendingWrite {
    Set {
        collection: String,
        id: String,
        fields: Fields,
        merge: bool,
    },
    Update {
        collection: String,
        id: String,
        updates: Vec<FieldUpdate>,
    },
}

impl PendingWrite {
    fn target(&self) -> (&str, &str) {
        match self {
            Self::Set { collection, id, .. } | Self::Update { collection, id, .. } => {
                (collection, id)
            }
        }
    }
}

/// Thread-safe in-memory document store
///
/// Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Check whether a collection is empty
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Every document of a collection, ordered by ID
    #[must_use]
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        let inner = self.inner.lock();
        inner
            .collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, d)| d.to_document(id)).collect())
            .unwrap_or_default()
    }
}

fn check_path(collection: &str, id: &str) -> Result<(), StoreError> {
    if collection.is_empty() || id.is_empty() || id.contains('/') {
        return Err(StoreError::InvalidArgument(format!(
            "invalid document path '{}'",
            document_path(collection, id)
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        check_path(collection, id)?;
        let inner = self.inner.lock();
        Ok(inner.lookup(collection, id).map(|d| d.to_document(id)))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        check_path(collection, id)?;
        let write = PendingWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge,
        };
        self.inner.lock().write(collection, id, &write)
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        check_path(collection, id)?;
        let mut inner = self.inner.lock();
        if inner.lookup(collection, id).is_some() {
            return Err(StoreError::already_exists(collection, id));
        }
        let write = PendingWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge: false,
        };
        inner.write(collection, id, &write)?;
        inner
            .lookup(collection, id)
            .map(|d| d.to_document(id))
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = Ulid::new().to_string();
        self.create(collection, &id, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        check_path(collection, id)?;
        let write = PendingWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            updates,
        };
        self.inner.lock().write(collection, id, &write)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        check_path(collection, id)?;
        let mut inner = self.inner.lock();
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let candidates = self.snapshot(&query.collection);
        Ok(query.evaluate(candidates))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            reads: HashMap::new(),
            writes: Vec::new(),
            closed: false,
        }))
    }
}

/// Transaction over a [`MemoryStore`]
struct MemoryTransaction {
    inner: Arc<Mutex<Inner>>,
    /// Observed version per document; `None` records observed absence
    reads: HashMap<(String, String), Option<u64>>,
    writes: Vec<PendingWrite>,
    closed: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::TransactionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_open()?;
        check_path(collection, id)?;
        if !self.writes.is_empty() {
            return Err(StoreError::InvalidArgument(
                "transaction reads must precede writes".to_string(),
            ));
        }
        let doc = {
            let inner = self.inner.lock();
            inner.lookup(collection, id).map(|d| d.to_document(id))
        };
        let observed = doc.as_ref().map(|d| d.version);
        // The first observation wins; a second read of the same document
        // must not paper over a change that happened in between.
        self.reads
            .entry((collection.to_string(), id.to_string()))
            .or_insert(observed);
        Ok(doc)
    }

    fn set(
        &mut self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        check_path(collection, id)?;
        self.writes.push(PendingWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge,
        });
        Ok(())
    }

    fn update(
        &mut self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        check_path(collection, id)?;
        self.writes.push(PendingWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            updates,
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.closed = true;

        let mut inner = self.inner.lock();

        for ((collection, id), observed) in &self.reads {
            if inner.version_of(collection, id) != *observed {
                tracing::debug!(collection = %collection, id = %id, "transaction read invalidated");
                return Err(StoreError::TransactionConflict(document_path(collection, id)));
            }
        }

        // Stage on a copy so a failing write leaves no partial state.
        let mut staged: HashMap<String, BTreeMap<String, StoredDoc>> = HashMap::new();
        for write in &self.writes {
            let (collection, _) = write.target();
            if !staged.contains_key(collection) {
                let current = inner.collections.get(collection).cloned().unwrap_or_default();
                staged.insert(collection.to_string(), current);
            }
        }

        let mut scratch = Inner {
            collections: staged,
            last_time: inner.last_time,
            version_counter: inner.version_counter,
        };
        for write in &self.writes {
            let (collection, id) = write.target();
            scratch.write(collection, id, write)?;
        }

        inner.last_time = scratch.last_time;
        inner.version_counter = scratch.version_counter;
        for (collection, docs) in scratch.collections {
            inner.collections.insert(collection, docs);
        }
        Ok(())
    }
}
