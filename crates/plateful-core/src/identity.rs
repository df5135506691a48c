//! Who is acting
//!
//! Ledger operations never take the actor as a parameter. They ask an
//! [`IdentityProvider`], so an operation cannot be performed on behalf of
//! somebody else by passing the wrong ID.

use crate::types::UserId;

/// Source of the signed-in user
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Currently signed-in user, if any
    fn current_actor_id(&self) -> Option<UserId>;
}

/// An identity that never changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    /// Signed in as `user`
    #[inline]
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self(Some(user))
    }

    /// Nobody signed in
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}
