//! User profiles and name search

use crate::context::Plateful;
use crate::error::PlatefulError;
use crate::model::{fields, UserAccount};
use crate::normalize::{normalize_search, prefix_upper_bound};
use crate::schema::{collections, review, user};
use crate::types::UserId;
use futures::stream::{self, StreamExt};
use plateful_store::{
    Direction, Document, FieldUpdate, Filter, FromDocument, OrderBy, Query, StoreError,
};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// Profile fields supplied at sign-up
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUser {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Home postal code
    pub postal_code: Option<String>,
}

impl NewUser {
    /// Profile with name and email
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            postal_code: None,
        }
    }
}

/// Partial profile edit; `None` leaves a field unchanged
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New biography; `Some(None)` clears it
    pub bio: Option<Option<String>>,
    /// New photo reference; `Some(None)` clears it
    pub profile_image: Option<Option<String>>,
    /// New postal code; `Some(None)` clears it
    pub postal_code: Option<Option<String>>,
}

/// Reviewer level for a review count: 1 plus the thresholds reached
#[must_use]
pub fn reviewer_level(review_count: u64, thresholds: &[u64]) -> u32 {
    let reached = thresholds.iter().filter(|t| review_count >= **t).count();
    u32::try_from(reached).map_or(u32::MAX, |n| n.saturating_add(1))
}

fn search_name(first: &str, last: &str) -> String {
    normalize_search(&format!("{first} {last}"))
}

fn set_or_clear(field: &str, value: Option<String>) -> FieldUpdate {
    match value {
        Some(value) => FieldUpdate::set(field, value),
        None => FieldUpdate::delete(field),
    }
}

/// User profile directory
#[derive(Debug, Clone)]
pub struct UserDirectory {
    ctx: Plateful,
}

impl UserDirectory {
    /// Create a directory over `ctx`
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        Self { ctx }
    }

    /// Create the profile for `id` unless it exists; returns the stored one
    ///
    /// Signing up twice is harmless: the second call returns the first
    /// profile untouched.
    #[instrument(skip(self, profile), fields(user = %id))]
    pub async fn ensure_profile(
        &self,
        id: &UserId,
        profile: NewUser,
    ) -> Result<UserAccount, PlatefulError> {
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(PlatefulError::validation("email is required"));
        }
        let mut record = fields([
            (user::FIRST_NAME, json!(profile.first_name.trim())),
            (user::LAST_NAME, json!(profile.last_name.trim())),
            (user::EMAIL, json!(email)),
            (user::LEVEL, json!(1)),
            (
                user::SEARCH_NAME,
                json!(search_name(&profile.first_name, &profile.last_name)),
            ),
            (user::FOLLOWERS, json!([])),
            (user::FOLLOWING, json!([])),
            (user::LIKED_RESTAURANTS, json!([])),
            (user::LIKED_REVIEWS, json!([])),
        ]);
        if let Some(code) = profile.postal_code {
            record.insert(user::POSTAL_CODE.into(), json!(code));
        }

        match self.ctx.store().create(collections::USERS, id.as_str(), record).await {
            Ok(doc) => {
                info!("profile created");
                Ok(UserAccount::from_document(&doc).into_value())
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!("profile already exists");
                self.get(id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a profile, `None` when absent
    pub async fn find(&self, id: &UserId) -> Result<Option<UserAccount>, PlatefulError> {
        let doc = self.ctx.store().get(collections::USERS, id.as_str()).await?;
        Ok(doc.map(|d| decode(&d)))
    }

    /// Fetch a profile
    ///
    /// # Errors
    /// `PlatefulError::NotFound` when absent.
    pub async fn get(&self, id: &UserId) -> Result<UserAccount, PlatefulError> {
        self.find(id).await?.ok_or_else(|| {
            PlatefulError::NotFound(plateful_store::document_path(collections::USERS, id.as_str()))
        })
    }

    /// Fetch many profiles concurrently; missing or failed ones are skipped
    pub async fn get_many(&self, ids: &[UserId]) -> Vec<UserAccount> {
        let width = self.ctx.config().feed.fanout_concurrency;
        stream::iter(ids.iter().cloned())
            .map(|id| async move { (self.find(&id).await, id) })
            .buffer_unordered(width)
            .filter_map(|(result, id)| async move {
                match result {
                    Ok(found) => found,
                    Err(err) => {
                        warn!(user = %id, error = %err, "profile fetch failed");
                        None
                    }
                }
            })
            .collect()
            .await
    }

    /// Edit the signed-in user's own profile
    ///
    /// # Errors
    /// `PlatefulError::PermissionDenied` when editing someone else.
    #[instrument(skip(self, changes), fields(user = %id))]
    pub async fn update_profile(
        &self,
        id: &UserId,
        changes: ProfileUpdate,
    ) -> Result<UserAccount, PlatefulError> {
        let actor = self.ctx.require_actor()?;
        if &actor != id {
            return Err(PlatefulError::PermissionDenied(format!(
                "{actor} cannot edit profile {id}"
            )));
        }
        let current = self.get(id).await?;

        let first = changes.first_name.unwrap_or(current.first_name);
        let last = changes.last_name.unwrap_or(current.last_name);
        let mut updates = vec![
            FieldUpdate::set(user::FIRST_NAME, first.trim()),
            FieldUpdate::set(user::LAST_NAME, last.trim()),
            FieldUpdate::set(user::SEARCH_NAME, search_name(&first, &last)),
        ];
        for (field, change) in [
            (user::BIO, changes.bio),
            (user::PROFILE_IMAGE, changes.profile_image),
            (user::POSTAL_CODE, changes.postal_code),
        ] {
            if let Some(value) = change {
                updates.push(set_or_clear(field, value));
            }
        }

        self.ctx
            .store()
            .update(collections::USERS, id.as_str(), updates)
            .await?;
        self.get(id).await
    }

    /// Profiles whose name starts with `prefix`, alphabetically
    ///
    /// An empty prefix matches nothing.
    #[instrument(skip(self))]
    pub async fn search_by_name(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<UserAccount>, PlatefulError> {
        let prefix = normalize_search(prefix);
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let query = Query::collection(collections::USERS)
            .filter(Filter::gte(user::SEARCH_NAME, prefix.as_str()))
            .filter(Filter::lt(user::SEARCH_NAME, prefix_upper_bound(&prefix)))
            .order_by(OrderBy::Field(user::SEARCH_NAME.into(), Direction::Ascending))
            .limit(limit.min(self.ctx.config().search.max_results));
        let docs = self.ctx.store().query(&query).await?;
        Ok(docs.iter().map(decode).collect())
    }

    /// Recount `id`'s reviews and store the resulting level
    #[instrument(skip(self), fields(user = %id))]
    pub async fn recompute_level(&self, id: &UserId) -> Result<u32, PlatefulError> {
        let query = Query::collection(collections::REVIEWS)
            .filter(Filter::equals(review::AUTHOR_ID, id.as_str()));
        let count = self.ctx.store().query(&query).await?.len() as u64;
        let level = reviewer_level(count, &self.ctx.config().reviews.level_thresholds);
        self.ctx
            .store()
            .update(
                collections::USERS,
                id.as_str(),
                vec![FieldUpdate::set(user::LEVEL, level)],
            )
            .await?;
        debug!(count, level, "reviewer level refreshed");
        Ok(level)
    }
}

fn decode(doc: &Document) -> UserAccount {
    let decoded = UserAccount::from_document(doc);
    if !decoded.is_complete() {
        debug!(user = %doc.id, defaulted = ?decoded.defaulted, "partial profile");
    }
    decoded.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_count_reached_thresholds() {
        let thresholds = [1, 5, 15, 30, 50, 100];
        assert_eq!(reviewer_level(0, &thresholds), 1);
        assert_eq!(reviewer_level(1, &thresholds), 2);
        assert_eq!(reviewer_level(14, &thresholds), 3);
        assert_eq!(reviewer_level(15, &thresholds), 4);
        assert_eq!(reviewer_level(10_000, &thresholds), 7);
        assert_eq!(reviewer_level(3, &[]), 1);
    }

    #[test]
    fn search_names_join_first_and_last() {
        assert_eq!(search_name(" Ada ", "Lovelace"), "ada lovelace");
        assert_eq!(search_name("", "Lovelace"), "lovelace");
    }
}
