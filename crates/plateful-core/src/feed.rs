//! Activity feeds
//!
//! A user's own feed is one query. The following feed fans out one query
//! per followed user with bounded concurrency, merges the pages newest
//! first and truncates to the limit. A followed user whose query fails is
//! dropped from the merge instead of failing the feed.
//!
//! Feeds are not transitive: only events authored by users the viewer
//! directly follows appear.

use crate::context::Plateful;
use crate::error::PlatefulError;
use crate::model::{ActivityEvent, UserAccount};
use crate::schema::{activity, collections};
use crate::types::UserId;
use futures::stream::{self, StreamExt};
use moka::future::Cache;
use plateful_store::{document_path, Direction, Filter, FromDocument, OrderBy, Query};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument, warn};

/// A feed event with its actor's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    /// The event
    pub event: ActivityEvent,
    /// Actor's display name, when it could be resolved
    pub actor_name: Option<String>,
}

/// Display names by user
///
/// Entries are never invalidated: a renamed user keeps their old name in
/// this cache until it is evicted for capacity.
#[derive(Debug, Clone)]
pub struct NameCache {
    inner: Cache<UserId, String>,
}

impl NameCache {
    /// Create a cache holding up to `capacity` names
    #[inline]
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    /// Cached name
    pub async fn get(&self, user: &UserId) -> Option<String> {
        self.inner.get(user).await
    }

    /// Cache a name
    pub async fn insert(&self, user: UserId, name: String) {
        self.inner.insert(user, name).await;
    }

    /// Approximate number of cached names
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

/// Activity feed reader
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    ctx: Plateful,
    names: NameCache,
}

impl ActivityFeed {
    /// Create a feed with an empty name cache
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        let names = NameCache::new(ctx.config().feed.name_cache_capacity);
        Self { ctx, names }
    }

    /// The display-name cache
    #[inline]
    #[must_use]
    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Configured default page size
    #[inline]
    #[must_use]
    pub fn default_limit(&self) -> usize {
        self.ctx.config().feed.default_limit
    }

    /// Events authored by `user`, newest first
    ///
    /// Events of unknown kind are skipped and do not count toward `limit`.
    #[instrument(skip(self))]
    pub async fn recent_activity_for(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityEvent>, PlatefulError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut fetch = limit;
        loop {
            let query = Query::collection(collections::ACTIVITIES)
                .filter(Filter::equals(activity::ACTOR_ID, user.as_str()))
                .order_by(OrderBy::CreateTime(Direction::Descending))
                .limit(fetch);
            let docs = self.ctx.store().query(&query).await?;
            let exhausted = docs.len() < fetch;
            let mut events: Vec<ActivityEvent> = docs
                .iter()
                .filter_map(|doc| {
                    let decoded = ActivityEvent::from_document(doc);
                    if decoded.defaulted(activity::KIND) {
                        debug!(event = %doc.id, "skipping event of unknown kind");
                        None
                    } else {
                        Some(decoded.into_value())
                    }
                })
                .collect();
            if events.len() >= limit || exhausted {
                events.truncate(limit);
                return Ok(events);
            }
            fetch = fetch.saturating_mul(2);
        }
    }

    /// Events authored by the users `user` follows, newest first
    ///
    /// # Errors
    /// `NotFound` when `user` has no profile. Failures of individual
    /// followed users are logged and skipped.
    #[instrument(skip(self))]
    pub async fn recent_activity_for_following(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityEvent>, PlatefulError> {
        let doc = self
            .ctx
            .store()
            .get(collections::USERS, user.as_str())
            .await?
            .ok_or_else(|| PlatefulError::NotFound(document_path(collections::USERS, user.as_str())))?;
        let following: BTreeSet<UserId> = UserAccount::from_document(&doc)
            .into_value()
            .following
            .into_iter()
            .filter(|followed| followed != user)
            .collect();
        if following.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let width = self.ctx.config().feed.fanout_concurrency;
        let pages: Vec<Vec<ActivityEvent>> = stream::iter(following)
            .map(|followed| async move {
                let page = self.recent_activity_for(&followed, limit).await;
                (followed, page)
            })
            .buffer_unordered(width)
            .filter_map(|(followed, page)| async move {
                match page {
                    Ok(events) => Some(events),
                    Err(err) => {
                        warn!(followed = %followed, error = %err, "dropping followed user from feed");
                        metrics::counter!("plateful.feed.dropped_child").increment(1);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(merge_newest_first(pages, limit))
    }

    /// Display names for the actors of `events`
    ///
    /// Served from the cache when possible. Actors whose profile is missing
    /// or unreadable are left out.
    pub async fn resolve_display_names(&self, events: &[ActivityEvent]) -> HashMap<UserId, String> {
        let actors: BTreeSet<UserId> = events.iter().map(|e| e.actor_id.clone()).collect();
        let width = self.ctx.config().feed.fanout_concurrency;
        stream::iter(actors)
            .map(|actor| async move {
                let name = self.display_name(&actor).await;
                (actor, name)
            })
            .buffer_unordered(width)
            .filter_map(|(actor, name)| async move { name.map(|n| (actor, n)) })
            .collect()
            .await
    }

    async fn display_name(&self, user: &UserId) -> Option<String> {
        if let Some(name) = self.names.get(user).await {
            return Some(name);
        }
        match self.ctx.users().find(user).await {
            Ok(Some(account)) => {
                let name = account.display_name();
                self.names.insert(user.clone(), name.clone()).await;
                Some(name)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(user = %user, error = %err, "display name lookup failed");
                None
            }
        }
    }

    /// Following feed with display names attached
    pub async fn feed_for_following(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<FeedEntry>, PlatefulError> {
        let events = self.recent_activity_for_following(user, limit).await?;
        let names = self.resolve_display_names(&events).await;
        Ok(events
            .into_iter()
            .map(|event| {
                let actor_name = names.get(&event.actor_id).cloned();
                FeedEntry { event, actor_name }
            })
            .collect())
    }
}

/// Merge per-user pages into one page, newest first, ties by event ID
#[must_use]
pub fn merge_newest_first(pages: Vec<Vec<ActivityEvent>>, limit: usize) -> Vec<ActivityEvent> {
    let mut merged: Vec<ActivityEvent> = pages.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(limit);
    merged
}
