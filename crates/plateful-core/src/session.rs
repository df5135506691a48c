//! Sign-in session with an explicit lifecycle
//!
//! A [`Session`] is created signed out. [`start`](Session::start) and
//! [`stop`](Session::stop) change the actor, and every change is published
//! to subscribers through a watch channel.

use crate::identity::IdentityProvider;
use crate::types::UserId;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared, observable sign-in state
#[derive(Debug, Clone)]
pub struct Session {
    actor: Arc<watch::Sender<Option<UserId>>>,
}

impl Session {
    /// Create a signed-out session
    #[must_use]
    pub fn new() -> Self {
        let (actor, _) = watch::channel(None);
        Self {
            actor: Arc::new(actor),
        }
    }

    /// Sign `user` in, replacing any previous actor
    pub fn start(&self, user: UserId) {
        info!(user = %user, "session started");
        self.actor.send_replace(Some(user));
    }

    /// Sign out
    pub fn stop(&self) {
        if self.actor.send_replace(None).is_some() {
            info!("session stopped");
        }
    }

    /// Signed-in user, if any
    #[must_use]
    pub fn current_actor(&self) -> Option<UserId> {
        self.actor.borrow().clone()
    }

    /// True while a user is signed in
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.actor.borrow().is_some()
    }

    /// Observe sign-in changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.actor.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for Session {
    fn current_actor_id(&self) -> Option<UserId> {
        self.current_actor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_signed_out() {
        let session = Session::new();
        assert!(!session.is_active());
        assert_eq!(session.current_actor_id(), None);
    }

    #[tokio::test]
    async fn subscribers_see_start_and_stop() {
        let session = Session::new();
        let mut changes = session.subscribe();

        session.start(UserId::from("alice"));
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), Some(UserId::from("alice")));

        let clone = session.clone();
        clone.stop();
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), None);
        assert!(!session.is_active());
    }

    #[test]
    fn start_replaces_previous_actor() {
        let session = Session::new();
        session.start(UserId::from("alice"));
        session.start(UserId::from("bob"));
        assert_eq!(session.current_actor(), Some(UserId::from("bob")));
    }
}
