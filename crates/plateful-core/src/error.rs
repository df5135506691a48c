//! Error types for the social ledger
//!
//! Store failures are folded into [`PlatefulError`] so callers deal with one
//! taxonomy:
//! - caller mistakes (self-reference, validation, not signed in)
//! - missing documents and denied access
//! - transient failures that are safe to retry

use plateful_store::StoreError;

/// Main error type for ledger and directory operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatefulError {
    /// Actor targeted themself (follow/unfollow)
    #[error("cannot target your own account: {0}")]
    SelfReference(String),

    /// No user is signed in
    #[error("no signed-in user")]
    NotAuthenticated,

    /// A transaction lost an optimistic-concurrency race
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// Referenced document does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure talking to the store
    #[error("network error: {0}")]
    Network(String),

    /// Actor may not touch this document
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Input rejected before reaching the store
    #[error("validation failed: {0}")]
    Validation(String),

    /// Any other store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlatefulError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_) | Self::Network(_))
    }

    /// Build a `Validation` error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message suitable for showing to an end user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SelfReference(_) => "You can't do that to your own account.".into(),
            Self::NotAuthenticated => "Please sign in to continue.".into(),
            Self::TransactionConflict(_) => {
                "Someone else updated this at the same time. Please try again.".into()
            }
            Self::NotFound(_) => "We couldn't find what you were looking for.".into(),
            Self::Network(_) => "Network problem. Check your connection and try again.".into(),
            Self::PermissionDenied(_) => "You don't have permission to do that.".into(),
            Self::Validation(message) => message.clone(),
            Self::Storage(_) | Self::Config(_) => {
                "Something went wrong. Please try again later.".into()
            }
        }
    }
}

impl From<StoreError> for PlatefulError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => Self::NotFound(path),
            StoreError::PermissionDenied(path) => Self::PermissionDenied(path),
            StoreError::TransactionConflict(path) => Self::TransactionConflict(path),
            StoreError::Network(message) => Self::Network(message),
            StoreError::InvalidArgument(message) => Self::Validation(message),
            other @ (StoreError::AlreadyExists(_) | StoreError::TransactionClosed) => {
                Self::Storage(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_ledger_taxonomy() {
        assert_eq!(
            PlatefulError::from(StoreError::not_found("users", "u1")),
            PlatefulError::NotFound("users/u1".into())
        );
        assert!(PlatefulError::from(StoreError::TransactionConflict("x".into())).is_retryable());
        assert!(PlatefulError::from(StoreError::Network("down".into())).is_retryable());
        assert!(matches!(
            PlatefulError::from(StoreError::already_exists("restaurants", "r")),
            PlatefulError::Storage(_)
        ));
    }

    #[test]
    fn caller_mistakes_are_not_retryable() {
        assert!(!PlatefulError::SelfReference("u1".into()).is_retryable());
        assert!(!PlatefulError::NotAuthenticated.is_retryable());
        assert!(!PlatefulError::validation("bad").is_retryable());
    }

    #[test]
    fn user_messages_hide_internals() {
        let err = PlatefulError::Storage("users/u1 exploded".into());
        assert!(!err.user_message().contains("users/u1"));
        assert_eq!(PlatefulError::validation("Pick a score").user_message(), "Pick a score");
    }
}
