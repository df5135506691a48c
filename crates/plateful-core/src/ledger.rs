//! Follow graph and like counters
//!
//! Every mutation resolves its actor from the identity provider. Follow
//! edges are written to both profiles in one transaction, so `following`
//! and `followers` never disagree. Review likes update the liker's set and
//! the review's counter in one transaction, so the counter always equals
//! the number of users holding the like.
//!
//! Concurrent transactions over the same documents are resolved
//! optimistically: the loser fails with
//! [`PlatefulError::TransactionConflict`] and nothing is retried here.

use crate::activity;
use crate::context::{Advisory, Plateful};
use crate::error::PlatefulError;
use crate::model::{ActivityEvent, NewActivity, Restaurant, Review, UserAccount};
use crate::schema::{collections, review, user};
use crate::types::{ActivityKind, RestaurantId, ReviewId, UserId};
use plateful_store::{document_path, FieldUpdate, Filter, FromDocument, Query};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Outcome of a like toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOutcome {
    /// False when the like was already in the requested state
    pub changed: bool,
    /// Activity event written for a new like
    pub activity: Advisory<ActivityEvent>,
}

impl LikeOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            activity: Advisory::Skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Follow,
    Unfollow,
}

/// Social graph and engagement ledger
#[derive(Debug, Clone)]
pub struct EngagementLedger {
    ctx: Plateful,
}

impl EngagementLedger {
    /// Create a ledger over `ctx`
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        Self { ctx }
    }

    /// Same ledger acting as `user`
    #[must_use]
    pub fn acting_as(&self, user: &UserId) -> Self {
        Self::new(self.ctx.acting_as(user))
    }

    /// Follow `target`. Following someone already followed is a no-op.
    ///
    /// # Errors
    /// - `SelfReference` when `target` is the actor
    /// - `NotFound` when either profile is missing
    /// - `TransactionConflict` when a concurrent write touched either profile
    #[instrument(skip(self), fields(target = %target))]
    pub async fn follow(&self, target: &UserId) -> Result<(), PlatefulError> {
        self.set_edge(target, Edge::Follow).await
    }

    /// Unfollow `target`. Unfollowing someone not followed is a no-op.
    ///
    /// # Errors
    /// Same as [`follow`](Self::follow).
    #[instrument(skip(self), fields(target = %target))]
    pub async fn unfollow(&self, target: &UserId) -> Result<(), PlatefulError> {
        self.set_edge(target, Edge::Unfollow).await
    }

    async fn set_edge(&self, target: &UserId, edge: Edge) -> Result<(), PlatefulError> {
        let actor = self.ctx.require_actor()?;
        if &actor == target {
            return Err(PlatefulError::SelfReference(actor.to_string()));
        }

        let mut txn = self.ctx.store().begin_transaction().await?;
        for id in [&actor, target] {
            if txn.get(collections::USERS, id.as_str()).await?.is_none() {
                return Err(PlatefulError::NotFound(document_path(
                    collections::USERS,
                    id.as_str(),
                )));
            }
        }

        let (outgoing, incoming) = match edge {
            Edge::Follow => (
                FieldUpdate::array_union(user::FOLLOWING, [target.as_str()]),
                FieldUpdate::array_union(user::FOLLOWERS, [actor.as_str()]),
            ),
            Edge::Unfollow => (
                FieldUpdate::array_remove(user::FOLLOWING, [target.as_str()]),
                FieldUpdate::array_remove(user::FOLLOWERS, [actor.as_str()]),
            ),
        };
        txn.update(collections::USERS, actor.as_str(), vec![outgoing])?;
        txn.update(collections::USERS, target.as_str(), vec![incoming])?;
        txn.commit().await?;

        match edge {
            Edge::Follow => metrics::counter!("plateful.ledger.follow").increment(1),
            Edge::Unfollow => metrics::counter!("plateful.ledger.unfollow").increment(1),
        }
        info!(actor = %actor, ?edge, "follow edge updated");
        Ok(())
    }

    /// Whether the actor follows `target`
    ///
    /// False when nobody is signed in, when `target` is the actor, or when
    /// the actor has no profile.
    pub async fn is_following(&self, target: &UserId) -> Result<bool, PlatefulError> {
        let Some(actor) = self.ctx.current_actor() else {
            return Ok(false);
        };
        if &actor == target {
            return Ok(false);
        }
        Ok(self
            .profile(&actor)
            .await?
            .is_some_and(|p| p.following.contains(target)))
    }

    /// Users following `user`; empty when the profile is missing
    pub async fn followers_of(&self, user: &UserId) -> Result<BTreeSet<UserId>, PlatefulError> {
        Ok(self.profile(user).await?.map(|p| p.followers).unwrap_or_default())
    }

    /// Users `user` follows; empty when the profile is missing
    pub async fn following_of(&self, user: &UserId) -> Result<BTreeSet<UserId>, PlatefulError> {
        Ok(self.profile(user).await?.map(|p| p.following).unwrap_or_default())
    }

    /// Like or unlike a restaurant
    ///
    /// A new like also appends a `LikedRestaurant` activity event. That
    /// append is advisory: if it fails the like still stands and the
    /// failure goes to diagnostics.
    ///
    /// # Errors
    /// - `NotFound` when the restaurant or the actor's profile is missing
    /// - `TransactionConflict` when the profile changed concurrently
    #[instrument(skip(self), fields(restaurant = %restaurant))]
    pub async fn set_restaurant_like(
        &self,
        restaurant: &RestaurantId,
        liked: bool,
    ) -> Result<LikeOutcome, PlatefulError> {
        let actor = self.ctx.require_actor()?;
        let place = self.restaurant(restaurant).await?;

        // Only the call that flips membership records an event.
        let mut txn = self.ctx.store().begin_transaction().await?;
        let profile = txn
            .get(collections::USERS, actor.as_str())
            .await?
            .ok_or_else(|| {
                PlatefulError::NotFound(document_path(collections::USERS, actor.as_str()))
            })?;
        let held = UserAccount::from_document(&profile)
            .value
            .liked_restaurants
            .contains(restaurant);
        if held == liked {
            debug!(liked, "restaurant like already in requested state");
            return Ok(LikeOutcome::unchanged());
        }

        let membership = if liked {
            FieldUpdate::array_union(user::LIKED_RESTAURANTS, [restaurant.as_str()])
        } else {
            FieldUpdate::array_remove(user::LIKED_RESTAURANTS, [restaurant.as_str()])
        };
        txn.update(collections::USERS, actor.as_str(), vec![membership])?;
        txn.commit().await?;
        metrics::counter!("plateful.ledger.restaurant_like").increment(1);
        info!(actor = %actor, liked, "restaurant like updated");

        let activity = if liked {
            let event = NewActivity {
                actor_id: actor,
                kind: ActivityKind::LikedRestaurant,
                restaurant_id: Some(restaurant.clone()),
                restaurant_name: Some(place.name),
                review_id: None,
            };
            let subject = document_path(collections::RESTAURANTS, restaurant.as_str());
            self.ctx
                .advisory("set_restaurant_like", &subject, activity::append(&self.ctx, event))
                .await
        } else {
            Advisory::Skipped
        };
        Ok(LikeOutcome {
            changed: true,
            activity,
        })
    }

    /// Like or unlike a review
    ///
    /// The liker's set and the review's `likeCount` change together or not
    /// at all. The counter never drops below zero. Unliking a review that
    /// has since been deleted only clears the liker's set.
    #[instrument(skip(self), fields(review = %review_id))]
    pub async fn set_review_like(
        &self,
        review_id: &ReviewId,
        liked: bool,
    ) -> Result<LikeOutcome, PlatefulError> {
        let actor = self.ctx.require_actor()?;

        let mut txn = self.ctx.store().begin_transaction().await?;
        let profile = txn
            .get(collections::USERS, actor.as_str())
            .await?
            .ok_or_else(|| {
                PlatefulError::NotFound(document_path(collections::USERS, actor.as_str()))
            })?;
        let target = txn.get(collections::REVIEWS, review_id.as_str()).await?;
        if liked && target.is_none() {
            return Err(PlatefulError::NotFound(document_path(
                collections::REVIEWS,
                review_id.as_str(),
            )));
        }

        let already = UserAccount::from_document(&profile)
            .value
            .liked_reviews
            .contains(review_id);
        if already == liked {
            debug!(liked, "review like already in requested state");
            return Ok(LikeOutcome::unchanged());
        }

        let Some(target) = target else {
            // The review is gone; drop the dangling like on its own.
            txn.update(
                collections::USERS,
                actor.as_str(),
                vec![FieldUpdate::array_remove(user::LIKED_REVIEWS, [review_id.as_str()])],
            )?;
            txn.commit().await?;
            info!(actor = %actor, "dangling review like removed");
            return Ok(LikeOutcome {
                changed: true,
                activity: Advisory::Skipped,
            });
        };

        let target = Review::from_document(&target).into_value();
        let (membership, count) = if liked {
            (
                FieldUpdate::array_union(user::LIKED_REVIEWS, [review_id.as_str()]),
                target.like_count.saturating_add(1),
            )
        } else {
            (
                FieldUpdate::array_remove(user::LIKED_REVIEWS, [review_id.as_str()]),
                target.like_count.saturating_sub(1),
            )
        };
        txn.update(collections::USERS, actor.as_str(), vec![membership])?;
        txn.update(
            collections::REVIEWS,
            review_id.as_str(),
            vec![FieldUpdate::set(review::LIKE_COUNT, count)],
        )?;
        txn.commit().await?;

        metrics::counter!("plateful.ledger.review_like").increment(1);
        info!(actor = %actor, liked, like_count = count, "review like updated");

        let activity = if liked {
            let event = NewActivity {
                actor_id: actor,
                kind: ActivityKind::LikedReview,
                restaurant_id: Some(target.restaurant_id),
                restaurant_name: None,
                review_id: Some(review_id.clone()),
            };
            let subject = document_path(collections::REVIEWS, review_id.as_str());
            self.ctx
                .advisory("set_review_like", &subject, activity::append(&self.ctx, event))
                .await
        } else {
            Advisory::Skipped
        };
        Ok(LikeOutcome {
            changed: true,
            activity,
        })
    }

    /// Whether the actor likes `restaurant`; false when signed out
    pub async fn has_liked_restaurant(
        &self,
        restaurant: &RestaurantId,
    ) -> Result<bool, PlatefulError> {
        let Some(actor) = self.ctx.current_actor() else {
            return Ok(false);
        };
        Ok(self
            .profile(&actor)
            .await?
            .is_some_and(|p| p.liked_restaurants.contains(restaurant)))
    }

    /// Whether the actor likes `review`; false when signed out
    pub async fn has_liked_review(&self, review: &ReviewId) -> Result<bool, PlatefulError> {
        let Some(actor) = self.ctx.current_actor() else {
            return Ok(false);
        };
        Ok(self
            .profile(&actor)
            .await?
            .is_some_and(|p| p.liked_reviews.contains(review)))
    }

    /// Number of users who like `restaurant`
    pub async fn restaurant_like_count(
        &self,
        restaurant: &RestaurantId,
    ) -> Result<usize, PlatefulError> {
        let query = Query::collection(collections::USERS)
            .filter(Filter::array_contains(user::LIKED_RESTAURANTS, restaurant.as_str()));
        Ok(self.ctx.store().query(&query).await?.len())
    }

    async fn profile(&self, id: &UserId) -> Result<Option<UserAccount>, PlatefulError> {
        let doc = self.ctx.store().get(collections::USERS, id.as_str()).await?;
        Ok(doc.map(|d| UserAccount::from_document(&d).into_value()))
    }

    async fn restaurant(&self, id: &RestaurantId) -> Result<Restaurant, PlatefulError> {
        let doc = self
            .ctx
            .store()
            .get(collections::RESTAURANTS, id.as_str())
            .await?
            .ok_or_else(|| {
                PlatefulError::NotFound(document_path(collections::RESTAURANTS, id.as_str()))
            })?;
        Ok(Restaurant::from_document(&doc).into_value())
    }
}
