//! Stored records and their document mappings
//!
//! Decoding never fails. Missing or mistyped fields fall back to defaults
//! and are listed in the returned [`Decoded`] report.

use crate::normalize::normalize_search;
use crate::schema::{activity, list, restaurant, review, user};
use crate::types::{
    ActivityKind, EventId, ListId, PriceLevel, RestaurantId, ReviewId, Score, UserId,
};
use chrono::{DateTime, Utc};
use plateful_store::{Decoded, Document, FieldReader, Fields, FromDocument};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn id_set<T: From<String> + Ord>(raw: BTreeSet<String>) -> BTreeSet<T> {
    raw.into_iter().map(T::from).collect()
}

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    /// Identity-provider ID
    pub id: UserId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Profile photo reference
    pub profile_image: Option<String>,
    /// Short biography
    pub bio: Option<String>,
    /// Reviewer level, starting at 1
    pub level: u32,
    /// Home postal code
    pub postal_code: Option<String>,
    /// Users following this user
    pub followers: BTreeSet<UserId>,
    /// Users this user follows
    pub following: BTreeSet<UserId>,
    /// Restaurants this user likes
    pub liked_restaurants: BTreeSet<RestaurantId>,
    /// Reviews this user likes
    pub liked_reviews: BTreeSet<ReviewId>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Name shown next to the user's activity
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

impl FromDocument for UserAccount {
    fn from_document(doc: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(doc);
        let value = Self {
            id: UserId::new(doc.id.clone()),
            first_name: r.string(user::FIRST_NAME),
            last_name: r.string(user::LAST_NAME),
            email: r.string(user::EMAIL),
            profile_image: r.opt_string(user::PROFILE_IMAGE),
            bio: r.opt_string(user::BIO),
            level: r.u32_or(user::LEVEL, 1).max(1),
            postal_code: r.opt_string(user::POSTAL_CODE),
            followers: id_set(r.string_set(user::FOLLOWERS)),
            following: id_set(r.string_set(user::FOLLOWING)),
            liked_restaurants: id_set(r.string_set(user::LIKED_RESTAURANTS)),
            liked_reviews: id_set(r.string_set(user::LIKED_REVIEWS)),
            created_at: doc.create_time,
        };
        r.finish(value)
    }
}

/// A restaurant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restaurant {
    /// Normalized `name|address` key
    pub id: RestaurantId,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub zip: String,
    /// Cuisine label
    pub cuisine: String,
    /// Price level, 1 to 4
    pub price_level: u8,
    /// Cover photo reference
    pub cover_image: Option<String>,
    /// Reviews counted at the last aggregate refresh
    pub review_count: u64,
    /// Mean food score at the last aggregate refresh
    pub avg_food_score: Option<f64>,
    /// Mean service score at the last aggregate refresh
    pub avg_service_score: Option<f64>,
}

impl FromDocument for Restaurant {
    fn from_document(doc: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(doc);
        let value = Self {
            id: RestaurantId::new(doc.id.clone()),
            name: r.string(restaurant::NAME),
            address: r.string(restaurant::ADDRESS),
            city: r.string(restaurant::CITY),
            state: r.string(restaurant::STATE),
            zip: r.string(restaurant::ZIP),
            cuisine: r.string(restaurant::CUISINE),
            price_level: r.u8_or(restaurant::PRICE_LEVEL, 1).clamp(1, 4),
            cover_image: r.opt_string(restaurant::COVER_IMAGE),
            review_count: r.u64_or(restaurant::REVIEW_COUNT, 0),
            avg_food_score: r.opt_f64(restaurant::AVG_FOOD),
            avg_service_score: r.opt_f64(restaurant::AVG_SERVICE),
        };
        r.finish(value)
    }
}

/// Input for registering a restaurant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewRestaurant {
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub zip: String,
    /// Cuisine label
    pub cuisine: String,
    /// Price level, 1 to 4
    pub price_level: u8,
}

impl NewRestaurant {
    /// Create input with the identifying fields
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            price_level: 2,
            ..Self::default()
        }
    }

    /// With city and state
    #[must_use]
    pub fn with_location(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = city.into();
        self.state = state.into();
        self
    }

    /// With cuisine
    #[must_use]
    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = cuisine.into();
        self
    }

    /// With price level
    #[must_use]
    pub fn with_price_level(mut self, level: u8) -> Self {
        self.price_level = level;
        self
    }

    pub(crate) fn to_fields(&self, price: PriceLevel) -> Fields {
        fields([
            (restaurant::NAME, json!(self.name.trim())),
            (restaurant::ADDRESS, json!(self.address.trim())),
            (restaurant::CITY, json!(self.city.trim())),
            (restaurant::STATE, json!(self.state.trim())),
            (restaurant::ZIP, json!(self.zip.trim())),
            (restaurant::CUISINE, json!(self.cuisine.trim())),
            (restaurant::PRICE_LEVEL, json!(price.get())),
            (restaurant::REVIEW_COUNT, json!(0)),
            (restaurant::SEARCH_NAME, json!(normalize_search(&self.name))),
            (restaurant::CITY_KEY, json!(normalize_search(&self.city))),
            (restaurant::CUISINE_KEY, json!(normalize_search(&self.cuisine))),
        ])
    }
}

/// A review of one restaurant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    /// Store-assigned ID
    pub id: ReviewId,
    /// Reviewed restaurant
    pub restaurant_id: RestaurantId,
    /// Author
    pub author_id: UserId,
    /// Food score
    pub food_score: Option<f64>,
    /// Service score
    pub service_score: Option<f64>,
    /// Food commentary
    pub food_text: Option<String>,
    /// Service commentary
    pub service_text: Option<String>,
    /// Photo and video references
    pub media: Vec<String>,
    /// Normalized tags
    pub tags: Vec<String>,
    /// When the visit happened
    pub visit_date: Option<DateTime<Utc>>,
    /// Users who like this review
    pub like_count: u64,
    /// When the review was published
    pub created_at: DateTime<Utc>,
    /// When the review last changed
    pub updated_at: DateTime<Utc>,
}

impl FromDocument for Review {
    fn from_document(doc: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(doc);
        let value = Self {
            id: ReviewId::new(doc.id.clone()),
            restaurant_id: RestaurantId::new(r.string(review::RESTAURANT_ID)),
            author_id: UserId::new(r.string(review::AUTHOR_ID)),
            food_score: r.opt_f64(review::FOOD_SCORE),
            service_score: r.opt_f64(review::SERVICE_SCORE),
            food_text: r.opt_string(review::FOOD_TEXT),
            service_text: r.opt_string(review::SERVICE_TEXT),
            media: r.string_vec(review::MEDIA),
            tags: r.string_vec(review::TAGS),
            visit_date: r.opt_timestamp(review::VISIT_DATE),
            like_count: r.u64_or(review::LIKE_COUNT, 0),
            created_at: doc.create_time,
            updated_at: doc.update_time,
        };
        r.finish(value)
    }
}

/// Input for publishing a review
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    /// Reviewed restaurant
    pub restaurant_id: RestaurantId,
    /// Food score, 0 to 5 in half steps
    pub food_score: Option<f64>,
    /// Service score, 0 to 5 in half steps
    pub service_score: Option<f64>,
    /// Food commentary
    pub food_text: Option<String>,
    /// Service commentary
    pub service_text: Option<String>,
    /// Photo and video references
    pub media: Vec<String>,
    /// Raw tags, normalized on write
    pub tags: Vec<String>,
    /// When the visit happened
    pub visit_date: Option<DateTime<Utc>>,
}

impl NewReview {
    /// Start a review of `restaurant`
    pub fn of(restaurant: impl Into<RestaurantId>) -> Self {
        Self {
            restaurant_id: restaurant.into(),
            food_score: None,
            service_score: None,
            food_text: None,
            service_text: None,
            media: Vec::new(),
            tags: Vec::new(),
            visit_date: None,
        }
    }

    /// With food score and text
    #[must_use]
    pub fn food(mut self, score: f64, text: impl Into<String>) -> Self {
        self.food_score = Some(score);
        self.food_text = Some(text.into());
        self
    }

    /// With service score and text
    #[must_use]
    pub fn service(mut self, score: f64, text: impl Into<String>) -> Self {
        self.service_score = Some(score);
        self.service_text = Some(text.into());
        self
    }

    /// With tags
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// With media references
    #[must_use]
    pub fn with_media<S: Into<String>>(mut self, media: impl IntoIterator<Item = S>) -> Self {
        self.media = media.into_iter().map(Into::into).collect();
        self
    }

    /// With visit date
    #[must_use]
    pub fn visited(mut self, at: DateTime<Utc>) -> Self {
        self.visit_date = Some(at);
        self
    }
}

/// One entry of the append-only activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    /// Store-assigned ID
    pub id: EventId,
    /// Who acted
    pub actor_id: UserId,
    /// What happened
    pub kind: ActivityKind,
    /// Restaurant involved
    pub restaurant_id: Option<RestaurantId>,
    /// Restaurant name at the time of the event
    pub restaurant_name: Option<String>,
    /// Review involved
    pub review_id: Option<ReviewId>,
    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
}

impl FromDocument for ActivityEvent {
    fn from_document(doc: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(doc);
        let actor_id = UserId::new(r.string(activity::ACTOR_ID));
        let raw_kind = r.string(activity::KIND);
        let kind = ActivityKind::parse(&raw_kind).unwrap_or_else(|| {
            if !raw_kind.is_empty() {
                r.reject(activity::KIND);
            }
            ActivityKind::LikedRestaurant
        });
        let value = Self {
            id: EventId::new(doc.id.clone()),
            actor_id,
            kind,
            restaurant_id: r.opt_string(activity::RESTAURANT_ID).map(RestaurantId::new),
            restaurant_name: r.opt_string(activity::RESTAURANT_NAME),
            review_id: r.opt_string(activity::REVIEW_ID).map(ReviewId::new),
            created_at: doc.create_time,
        };
        r.finish(value)
    }
}

/// Fields of a new activity event
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewActivity {
    pub(crate) actor_id: UserId,
    pub(crate) kind: ActivityKind,
    pub(crate) restaurant_id: Option<RestaurantId>,
    pub(crate) restaurant_name: Option<String>,
    pub(crate) review_id: Option<ReviewId>,
}

impl NewActivity {
    pub(crate) fn to_fields(&self) -> Fields {
        let mut fields = fields([
            (activity::ACTOR_ID, json!(self.actor_id.as_str())),
            (activity::KIND, json!(self.kind.as_str())),
        ]);
        if let Some(id) = &self.restaurant_id {
            fields.insert(activity::RESTAURANT_ID.into(), json!(id.as_str()));
        }
        if let Some(name) = &self.restaurant_name {
            fields.insert(activity::RESTAURANT_NAME.into(), json!(name));
        }
        if let Some(id) = &self.review_id {
            fields.insert(activity::REVIEW_ID.into(), json!(id.as_str()));
        }
        fields
    }
}

/// A named, owner-curated set of restaurants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantList {
    /// Store-assigned ID
    pub id: ListId,
    /// Title
    pub name: String,
    /// Optional blurb
    pub description: Option<String>,
    /// Owner
    pub owner_id: UserId,
    /// Member restaurants
    pub restaurant_ids: BTreeSet<RestaurantId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl FromDocument for RestaurantList {
    fn from_document(doc: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(doc);
        let value = Self {
            id: ListId::new(doc.id.clone()),
            name: r.string(list::NAME),
            description: r.opt_string(list::DESCRIPTION),
            owner_id: UserId::new(r.string(list::OWNER_ID)),
            restaurant_ids: id_set(r.string_set(list::RESTAURANT_IDS)),
            created_at: doc.create_time,
            updated_at: doc.update_time,
        };
        r.finish(value)
    }
}

/// Aggregate of a restaurant's review scores
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreSummary {
    /// Reviews counted
    pub review_count: u64,
    /// Mean food score over reviews that have one
    pub avg_food_score: Option<f64>,
    /// Mean service score over reviews that have one
    pub avg_service_score: Option<f64>,
}

impl ScoreSummary {
    /// Aggregate a set of reviews
    #[must_use]
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut count = 0_u64;
        let (mut food, mut service) = (Mean::default(), Mean::default());
        for review in reviews {
            count += 1;
            food.push(review.food_score);
            service.push(review.service_score);
        }
        Self {
            review_count: count,
            avg_food_score: food.get(),
            avg_service_score: service.get(),
        }
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: u32,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / f64::from(self.n))
    }
}

pub(crate) fn score_value(score: Option<Score>) -> Value {
    score.map_or(Value::Null, |s| json!(s.value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(id: &str, fields: Value) -> Document {
        let now = Utc::now();
        Document {
            id: id.into(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    #[test]
    fn partial_user_documents_decode_with_defaults() {
        let decoded = UserAccount::from_document(&doc(
            "u1",
            json!({ "firstName": "Ada", "following": ["u2", 3] }),
        ));
        let user = &decoded.value;
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.level, 1);
        assert!(user.following.contains(&UserId::from("u2")));
        assert!(user.followers.is_empty());
        assert!(decoded.defaulted("lastName"));
        assert!(decoded.defaulted("following"));
        assert!(decoded.defaulted("likedReviews"));
        assert!(!decoded.defaulted("bio"));
        assert_eq!(user.display_name(), "Ada");
    }

    #[test]
    fn new_review_starts_empty_for_its_restaurant() {
        let draft = NewReview::of("joes-diner|1-main-st");
        assert_eq!(draft.restaurant_id, RestaurantId::from("joes-diner|1-main-st"));
        assert_eq!(draft.food_score, None);
        assert!(draft.tags.is_empty() && draft.media.is_empty());

        let draft = draft.food(4.0, "Crisp").with_tags(["pie"]);
        assert_eq!(draft.food_text.as_deref(), Some("Crisp"));
        assert_eq!(draft.service_score, None);
        assert_eq!(draft.tags, vec!["pie".to_string()]);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = UserAccount::from_document(&doc("u1", json!({ "email": "a@b.c" }))).value;
        assert_eq!(user.display_name(), "a@b.c");
    }

    #[test]
    fn negative_like_counts_read_as_zero() {
        let decoded = Review::from_document(&doc(
            "r1",
            json!({ "restaurantId": "x|y", "authorId": "u1", "likeCount": -3 }),
        ));
        assert_eq!(decoded.value.like_count, 0);
        assert!(decoded.defaulted("likeCount"));
    }

    #[test]
    fn unknown_activity_kinds_are_flagged() {
        let decoded = ActivityEvent::from_document(&doc(
            "e1",
            json!({ "actorId": "u1", "kind": "poked" }),
        ));
        assert!(decoded.defaulted("kind"));

        let ok = ActivityEvent::from_document(&doc(
            "e2",
            json!({ "actorId": "u1", "kind": "liked-review", "reviewId": "rv" }),
        ));
        assert!(ok.is_complete());
        assert_eq!(ok.value.kind, ActivityKind::LikedReview);
        assert_eq!(ok.value.review_id, Some(ReviewId::from("rv")));
    }

    #[test]
    fn activity_fields_omit_absent_references() {
        let fields = NewActivity {
            actor_id: UserId::from("u1"),
            kind: ActivityKind::LikedRestaurant,
            restaurant_id: Some(RestaurantId::from("a|b")),
            restaurant_name: None,
            review_id: None,
        }
        .to_fields();
        assert_eq!(fields.len(), 3);
        assert!(!fields.contains_key("reviewId"));
    }

    #[test]
    fn score_summary_averages_present_scores_only() {
        let mk = |food: Option<f64>, service: Option<f64>| Review {
            food_score: food,
            service_score: service,
            ..Review::from_document(&doc("r", json!({}))).value
        };
        let reviews = [mk(Some(4.0), None), mk(Some(3.0), Some(5.0)), mk(None, None)];
        let summary = ScoreSummary::from_reviews(&reviews);
        assert_eq!(summary.review_count, 3);
        assert_eq!(summary.avg_food_score, Some(3.5));
        assert_eq!(summary.avg_service_score, Some(5.0));
        assert_eq!(ScoreSummary::from_reviews(&[]), ScoreSummary::default());
    }
}
