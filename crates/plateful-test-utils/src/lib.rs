//! Testing utilities for Plateful workspace
//!
//! Shared fixtures plus store wrappers that inject faults or force
//! interleavings.

#![allow(missing_docs)]

mod faulty;
mod interleaving;

pub use faulty::{Fault, FaultyStore};
pub use interleaving::InterleavingStore;

use plateful_core::{NewRestaurant, NewUser, Plateful, PlatefulConfig, RestaurantId, StaticIdentity, UserId};
use plateful_store::{DocumentStore, MemoryStore};
use std::sync::Arc;

/// An app wired to an in-memory store with nobody signed in
#[derive(Debug, Clone)]
pub struct TestWorld {
    pub store: MemoryStore,
    pub app: Plateful,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(PlatefulConfig::new())
    }

    pub fn with_config(config: PlatefulConfig) -> Self {
        let store = MemoryStore::new();
        let app = app_over(Arc::new(store.clone()), config);
        Self { store, app }
    }

    /// Create a profile named `first` and return its ID
    pub async fn user(&self, first: &str) -> UserId {
        seed_user(&self.app, first).await
    }

    /// Register a restaurant and return its ID
    pub async fn restaurant(&self, name: &str, address: &str) -> RestaurantId {
        seed_restaurant(&self.app, name, address).await
    }

    pub fn as_user(&self, user: &UserId) -> Plateful {
        self.app.acting_as(user)
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire an app over any store with nobody signed in
pub fn app_over(store: Arc<dyn DocumentStore>, config: PlatefulConfig) -> Plateful {
    Plateful::new(store, Arc::new(StaticIdentity::anonymous()), config)
        .expect("test config is valid")
}

pub async fn seed_user(app: &Plateful, first: &str) -> UserId {
    let id = UserId::new(first.to_lowercase());
    app.users()
        .ensure_profile(
            &id,
            NewUser::new(first, "Tester", format!("{}@example.com", first.to_lowercase())),
        )
        .await
        .expect("seed user");
    id
}

pub async fn seed_restaurant(app: &Plateful, name: &str, address: &str) -> RestaurantId {
    app.restaurants()
        .create_or_get(
            NewRestaurant::new(name, address)
                .with_location("Springfield", "IL")
                .with_cuisine("Diner"),
        )
        .await
        .expect("seed restaurant")
        .restaurant
        .id
}
