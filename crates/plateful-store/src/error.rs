//! Error types for the document store
//!
//! These are the failure modes a store surfaces to its callers. Callers in
//! higher layers translate them into their own taxonomy.

/// Errors returned by [`DocumentStore`](crate::DocumentStore) and
/// [`Transaction`](crate::Transaction) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Referenced document does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Conditional create hit an existing document
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// Caller is not allowed to perform the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A document read inside a transaction changed before commit
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// Transport failure talking to the backend
    #[error("network error: {0}")]
    Network(String),

    /// Malformed request (bad path, reads after writes, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transaction was used after commit
    #[error("transaction already closed")]
    TransactionClosed,
}

impl StoreError {
    /// Build a `NotFound` for `collection/id`
    #[inline]
    #[must_use]
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound(document_path(collection, id))
    }

    /// Build an `AlreadyExists` for `collection/id`
    #[inline]
    #[must_use]
    pub fn already_exists(collection: &str, id: &str) -> Self {
        Self::AlreadyExists(document_path(collection, id))
    }

    /// Check if a retry of the same request could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_) | Self::Network(_))
    }
}

/// Canonical `collection/id` path used in error messages
#[inline]
#[must_use]
pub fn document_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_path() {
        let err = StoreError::not_found("users", "alice");
        assert_eq!(err.to_string(), "document not found: users/alice");
    }

    #[test]
    fn retryable_classification() {
        assert!(StoreError::TransactionConflict("x".into()).is_retryable());
        assert!(StoreError::Network("timeout".into()).is_retryable());
        assert!(!StoreError::NotFound("x".into()).is_retryable());
        assert!(!StoreError::TransactionClosed.is_retryable());
    }
}
