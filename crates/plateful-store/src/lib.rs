//! Plateful Store - document database contract
//!
//! The social ledger never talks to a concrete backend. It talks to a
//! [`DocumentStore`]: collections of schema-flexible documents with
//! - per-document get/set/create/update/delete
//! - atomic array-union / array-remove / increment field updates
//! - optimistic multi-document transactions
//! - filtered, ordered, limited queries
//!
//! [`MemoryStore`] is a complete in-process implementation used for tests
//! and simulation. [`FieldReader`] turns loosely-typed documents into typed
//! records while reporting which fields fell back to defaults.
//!
//! # Example
//!
//! ```rust,ignore
//! use plateful_store::{DocumentStore, FieldUpdate, MemoryStore};
//!
//! # async fn example() -> Result<(), plateful_store::StoreError> {
//! let store = MemoryStore::new();
//! let mut txn = store.begin_transaction().await?;
//! txn.get("users", "alice").await?;
//! txn.update("users", "alice", vec![FieldUpdate::array_union("following", ["bob"])])?;
//! txn.commit().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod decode;
pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use decode::{Decoded, FieldReader, FromDocument};
pub use document::{merge_fields, Document, FieldUpdate, Fields};
pub use error::{document_path, StoreError};
pub use memory::MemoryStore;
pub use query::{compare_values, Direction, Filter, FilterOp, OrderBy, Query};
pub use traits::{DocumentStore, Transaction};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
