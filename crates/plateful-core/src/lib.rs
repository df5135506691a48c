//! Plateful Core - social graph and engagement ledger
//!
//! The services behind a restaurant-review social app:
//! - follow / unfollow with mirrored `following` and `followers` sets
//! - restaurant and review likes with transactional counters
//! - an append-only activity log and fan-out following feeds
//! - user and restaurant directories with prefix search
//! - reviews, reviewer levels and curated restaurant lists
//!
//! Everything runs against a [`plateful_store::DocumentStore`]. The actor of
//! every mutation comes from an [`IdentityProvider`], never from arguments.
//!
//! # Example
//!
//! ```rust,ignore
//! use plateful_core::prelude::*;
//! use plateful_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), PlatefulError> {
//! let session = Arc::new(Session::new());
//! let app = Plateful::new(Arc::new(MemoryStore::new()), session.clone(), PlatefulConfig::new())?;
//!
//! let alice = UserId::from("alice");
//! app.users().ensure_profile(&alice, NewUser::new("Alice", "A", "alice@example.com")).await?;
//! session.start(alice.clone());
//!
//! let joes = app.restaurants().create_or_get(NewRestaurant::new("Joe's Diner", "1 Main St")).await?;
//! app.ledger().set_restaurant_like(&joes.restaurant.id, true).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

mod activity;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod feed;
pub mod identity;
pub mod ledger;
pub mod lists;
pub mod model;
pub mod normalize;
pub mod restaurants;
pub mod retry;
pub mod reviews;
pub mod schema;
pub mod session;
pub mod types;
pub mod users;

pub use config::{DiagnosticsConfig, FeedConfig, PlatefulConfig, ReviewConfig, SearchConfig};
pub use context::{Advisory, Plateful};
pub use diagnostics::{AdvisoryFailure, Diagnostics};
pub use error::PlatefulError;
pub use feed::{merge_newest_first, ActivityFeed, FeedEntry, NameCache};
pub use identity::{IdentityProvider, StaticIdentity};
pub use ledger::{EngagementLedger, LikeOutcome};
pub use lists::ListService;
pub use model::{
    ActivityEvent, NewRestaurant, NewReview, Restaurant, RestaurantList, Review, ScoreSummary,
    UserAccount,
};
pub use normalize::{normalize_key_part, normalize_search, normalize_tags, restaurant_key};
pub use restaurants::{Registration, RestaurantDirectory, RestaurantFilter};
pub use retry::{with_backoff, RetryPolicy};
pub use reviews::{CreatedReview, ReviewService};
pub use session::Session;
pub use types::{ActivityKind, EventId, ListId, PriceLevel, RestaurantId, ReviewId, Score, UserId};
pub use users::{reviewer_level, NewUser, ProfileUpdate, UserDirectory};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Plateful Core
    pub use crate::{
        ActivityEvent, ActivityKind, NewRestaurant, NewReview, NewUser, Plateful, PlatefulConfig,
        PlatefulError, RestaurantId, ReviewId, Session, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
