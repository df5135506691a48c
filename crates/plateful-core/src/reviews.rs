//! Publishing and reading reviews

use crate::activity;
use crate::context::{Advisory, Plateful};
use crate::error::PlatefulError;
use crate::model::{fields, score_value, ActivityEvent, NewActivity, NewReview, Review};
use crate::normalize::normalize_tags;
use crate::schema::{collections, review};
use crate::types::{ActivityKind, RestaurantId, ReviewId, Score, UserId};
use plateful_store::{document_path, Direction, Document, Filter, FromDocument, OrderBy, Query};
use serde_json::json;
use tracing::{debug, info, instrument};

/// A freshly published review
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedReview {
    /// The stored review
    pub review: Review,
    /// `CreatedReview` activity event
    pub activity: Advisory<ActivityEvent>,
    /// Author's refreshed level
    pub level: Advisory<u32>,
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Review service
#[derive(Debug, Clone)]
pub struct ReviewService {
    ctx: Plateful,
}

impl ReviewService {
    /// Create a service over `ctx`
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        Self { ctx }
    }

    /// Publish a review as the signed-in user
    ///
    /// The review must carry at least one score or comment. After it is
    /// stored, a `CreatedReview` activity event is appended and the author's
    /// level recomputed; both are advisory.
    ///
    /// # Errors
    /// - `Validation` on out-of-range scores or an empty review
    /// - `NotFound` when the restaurant does not exist
    #[instrument(skip(self, input), fields(restaurant = %input.restaurant_id))]
    pub async fn create_review(&self, input: NewReview) -> Result<CreatedReview, PlatefulError> {
        let author = self.ctx.require_actor()?;
        let food_score = input.food_score.map(Score::new).transpose()?;
        let service_score = input.service_score.map(Score::new).transpose()?;
        let food_text = non_empty(input.food_text);
        let service_text = non_empty(input.service_text);
        if food_score.is_none()
            && service_score.is_none()
            && food_text.is_none()
            && service_text.is_none()
        {
            return Err(PlatefulError::validation(
                "a review needs a score or a comment",
            ));
        }

        let place = self.ctx.restaurants().get(&input.restaurant_id).await?;
        let tags = normalize_tags(&input.tags, self.ctx.config().reviews.max_tags);
        let media: Vec<String> = input
            .media
            .into_iter()
            .filter_map(|m| non_empty(Some(m)))
            .collect();

        let mut record = fields([
            (review::RESTAURANT_ID, json!(place.id.as_str())),
            (review::AUTHOR_ID, json!(author.as_str())),
            (review::FOOD_SCORE, score_value(food_score)),
            (review::SERVICE_SCORE, score_value(service_score)),
            (review::MEDIA, json!(media)),
            (review::TAGS, json!(tags)),
            (review::LIKE_COUNT, json!(0)),
        ]);
        for (field, text) in [(review::FOOD_TEXT, food_text), (review::SERVICE_TEXT, service_text)] {
            if let Some(text) = text {
                record.insert(field.into(), json!(text));
            }
        }
        if let Some(at) = input.visit_date {
            record.insert(review::VISIT_DATE.into(), json!(at.to_rfc3339()));
        }

        let doc = self.ctx.store().add(collections::REVIEWS, record).await?;
        let stored = decode(&doc);
        info!(review = %stored.id, author = %author, "review published");

        let subject = document_path(collections::REVIEWS, &doc.id);
        let event = NewActivity {
            actor_id: author.clone(),
            kind: ActivityKind::CreatedReview,
            restaurant_id: Some(place.id),
            restaurant_name: Some(place.name),
            review_id: Some(stored.id.clone()),
        };
        let activity = self
            .ctx
            .advisory("create_review", &subject, activity::append(&self.ctx, event))
            .await;
        let level = self
            .ctx
            .advisory(
                "recompute_level",
                &subject,
                self.ctx.users().recompute_level(&author),
            )
            .await;

        Ok(CreatedReview {
            review: stored,
            activity,
            level,
        })
    }

    /// Fetch a review, `None` when absent
    pub async fn find(&self, id: &ReviewId) -> Result<Option<Review>, PlatefulError> {
        let doc = self.ctx.store().get(collections::REVIEWS, id.as_str()).await?;
        Ok(doc.map(|d| decode(&d)))
    }

    /// Fetch a review
    ///
    /// # Errors
    /// `PlatefulError::NotFound` when absent.
    pub async fn get(&self, id: &ReviewId) -> Result<Review, PlatefulError> {
        self.find(id).await?.ok_or_else(|| {
            PlatefulError::NotFound(document_path(collections::REVIEWS, id.as_str()))
        })
    }

    /// Newest reviews of a restaurant
    pub async fn reviews_for_restaurant(
        &self,
        restaurant: &RestaurantId,
        limit: usize,
    ) -> Result<Vec<Review>, PlatefulError> {
        self.newest(Filter::equals(review::RESTAURANT_ID, restaurant.as_str()), limit)
            .await
    }

    /// Newest reviews by an author
    pub async fn reviews_by_author(
        &self,
        author: &UserId,
        limit: usize,
    ) -> Result<Vec<Review>, PlatefulError> {
        self.newest(Filter::equals(review::AUTHOR_ID, author.as_str()), limit)
            .await
    }

    async fn newest(&self, filter: Filter, limit: usize) -> Result<Vec<Review>, PlatefulError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = Query::collection(collections::REVIEWS)
            .filter(filter)
            .order_by(OrderBy::CreateTime(Direction::Descending))
            .limit(limit);
        let docs = self.ctx.store().query(&query).await?;
        Ok(docs.iter().map(decode).collect())
    }

    /// Delete one of the signed-in user's own reviews
    ///
    /// # Errors
    /// `PermissionDenied` when the actor is not the author.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, id: &ReviewId) -> Result<(), PlatefulError> {
        let actor = self.ctx.require_actor()?;
        let existing = self.get(id).await?;
        if existing.author_id != actor {
            return Err(PlatefulError::PermissionDenied(format!(
                "{actor} is not the author of review {id}"
            )));
        }
        self.ctx
            .store()
            .delete(collections::REVIEWS, id.as_str())
            .await?;
        info!(review = %id, "review deleted");

        let subject = document_path(collections::REVIEWS, id.as_str());
        self.ctx
            .advisory(
                "recompute_level",
                &subject,
                self.ctx.users().recompute_level(&actor),
            )
            .await;
        Ok(())
    }
}

fn decode(doc: &Document) -> Review {
    let decoded = Review::from_document(doc);
    if !decoded.is_complete() {
        debug!(review = %doc.id, defaulted = ?decoded.defaulted, "partial review");
    }
    decoded.into_value()
}
