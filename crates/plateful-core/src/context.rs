//! Shared handle wiring store, identity, configuration and diagnostics
//!
//! [`Plateful`] is cheap to clone. Every service borrows one and resolves
//! the actor through its identity provider at call time.

use crate::config::PlatefulConfig;
use crate::diagnostics::{AdvisoryFailure, Diagnostics};
use crate::error::PlatefulError;
use crate::feed::ActivityFeed;
use crate::identity::{IdentityProvider, StaticIdentity};
use crate::ledger::EngagementLedger;
use crate::lists::ListService;
use crate::restaurants::RestaurantDirectory;
use crate::reviews::ReviewService;
use crate::types::UserId;
use crate::users::UserDirectory;
use chrono::Utc;
use plateful_store::DocumentStore;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of a best-effort secondary write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory<T> {
    /// Nothing needed writing
    Skipped,
    /// Written
    Recorded(T),
    /// Failed and reported to [`Diagnostics`]
    Failed,
}

impl<T> Advisory<T> {
    /// True when the write failed
    #[inline]
    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The written value, if any
    #[must_use]
    pub fn recorded(&self) -> Option<&T> {
        match self {
            Self::Recorded(value) => Some(value),
            _ => None,
        }
    }
}

/// Application handle
#[derive(Clone)]
pub struct Plateful {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    config: Arc<PlatefulConfig>,
    diagnostics: Diagnostics,
}

impl Plateful {
    /// Wire a store and identity provider
    ///
    /// # Errors
    /// `PlatefulError::Config` when `config` fails validation.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: PlatefulConfig,
    ) -> Result<Self, PlatefulError> {
        config.validate()?;
        let diagnostics = Diagnostics::new(config.diagnostics.capacity);
        Ok(Self {
            store,
            identity,
            config: Arc::new(config),
            diagnostics,
        })
    }

    /// Same store, config and diagnostics, acting as `user`
    #[must_use]
    pub fn acting_as(&self, user: &UserId) -> Self {
        Self {
            identity: Arc::new(StaticIdentity::signed_in(user.clone())),
            ..self.clone()
        }
    }

    /// Same wiring with nobody signed in
    #[must_use]
    pub fn anonymous(&self) -> Self {
        Self {
            identity: Arc::new(StaticIdentity::anonymous()),
            ..self.clone()
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PlatefulConfig {
        &self.config
    }

    /// Advisory failure channel
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Signed-in user, if any
    #[must_use]
    pub fn current_actor(&self) -> Option<UserId> {
        self.identity.current_actor_id()
    }

    pub(crate) fn require_actor(&self) -> Result<UserId, PlatefulError> {
        self.current_actor().ok_or(PlatefulError::NotAuthenticated)
    }

    /// User profiles
    #[must_use]
    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(self.clone())
    }

    /// Restaurant registry
    #[must_use]
    pub fn restaurants(&self) -> RestaurantDirectory {
        RestaurantDirectory::new(self.clone())
    }

    /// Follows and likes
    #[must_use]
    pub fn ledger(&self) -> EngagementLedger {
        EngagementLedger::new(self.clone())
    }

    /// Reviews
    #[must_use]
    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(self.clone())
    }

    /// Restaurant lists
    #[must_use]
    pub fn lists(&self) -> ListService {
        ListService::new(self.clone())
    }

    /// Activity feed with its own name cache
    #[must_use]
    pub fn feed(&self) -> ActivityFeed {
        ActivityFeed::new(self.clone())
    }

    /// Run a secondary write; a failure is reported, never returned
    pub(crate) async fn advisory<T, F>(
        &self,
        operation: &str,
        subject: &str,
        write: F,
    ) -> Advisory<T>
    where
        F: Future<Output = Result<T, PlatefulError>>,
    {
        match write.await {
            Ok(value) => Advisory::Recorded(value),
            Err(err) => {
                self.diagnostics.record(AdvisoryFailure {
                    operation: operation.to_string(),
                    actor: self.current_actor(),
                    subject: subject.to_string(),
                    error: err.to_string(),
                    at: Utc::now(),
                });
                Advisory::Failed
            }
        }
    }
}

impl fmt::Debug for Plateful {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plateful")
            .field("actor", &self.current_actor())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
