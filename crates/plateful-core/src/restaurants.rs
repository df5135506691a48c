//! Restaurant registry, search and score aggregates
//!
//! A restaurant's document ID is derived from its normalized name and
//! address, and registration is a conditional create on that ID. Two
//! clients registering the same place at the same time therefore converge
//! on one document: exactly one create wins, the other reads the winner.

use crate::context::Plateful;
use crate::error::PlatefulError;
use crate::model::{NewRestaurant, Restaurant, Review, ScoreSummary};
use crate::normalize::{normalize_search, prefix_upper_bound, restaurant_key};
use crate::schema::{collections, restaurant, review};
use crate::types::{PriceLevel, RestaurantId};
use futures::stream::{self, StreamExt};
use plateful_store::{
    document_path, Direction, Document, FieldUpdate, Filter, FromDocument, OrderBy, Query,
    StoreError,
};
use tracing::{debug, info, instrument, warn};

/// Outcome of [`RestaurantDirectory::create_or_get`]
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// The stored restaurant
    pub restaurant: Restaurant,
    /// False when an existing document was returned
    pub created: bool,
}

/// Structured restaurant search; absent criteria match everything
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestaurantFilter {
    /// City, compared case-insensitively
    pub city: Option<String>,
    /// Cuisine, compared case-insensitively
    pub cuisine: Option<String>,
    /// Highest acceptable price level
    pub max_price: Option<u8>,
}

/// Restaurant directory
#[derive(Debug, Clone)]
pub struct RestaurantDirectory {
    ctx: Plateful,
}

impl RestaurantDirectory {
    /// Create a directory over `ctx`
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        Self { ctx }
    }

    /// Register a restaurant, or return the one already stored under the
    /// same normalized name and address
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_or_get(&self, input: NewRestaurant) -> Result<Registration, PlatefulError> {
        let price = PriceLevel::new(input.price_level)?;
        let key = restaurant_key(&input.name, &input.address)?;

        match self
            .ctx
            .store()
            .create(collections::RESTAURANTS, &key, input.to_fields(price))
            .await
        {
            Ok(doc) => {
                info!(restaurant = %key, "restaurant registered");
                Ok(Registration {
                    restaurant: decode(&doc),
                    created: true,
                })
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(restaurant = %key, "restaurant already registered");
                let restaurant = self.get(&RestaurantId::new(key)).await?;
                Ok(Registration {
                    restaurant,
                    created: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a restaurant, `None` when absent
    pub async fn find(&self, id: &RestaurantId) -> Result<Option<Restaurant>, PlatefulError> {
        let doc = self
            .ctx
            .store()
            .get(collections::RESTAURANTS, id.as_str())
            .await?;
        Ok(doc.map(|d| decode(&d)))
    }

    /// Fetch a restaurant
    ///
    /// # Errors
    /// `PlatefulError::NotFound` when absent.
    pub async fn get(&self, id: &RestaurantId) -> Result<Restaurant, PlatefulError> {
        self.find(id).await?.ok_or_else(|| {
            PlatefulError::NotFound(document_path(collections::RESTAURANTS, id.as_str()))
        })
    }

    /// Fetch many restaurants concurrently; missing or failed ones are skipped
    pub async fn get_many(&self, ids: &[RestaurantId]) -> Vec<Restaurant> {
        let width = self.ctx.config().feed.fanout_concurrency;
        stream::iter(ids.iter().cloned())
            .map(|id| async move { (self.find(&id).await, id) })
            .buffer_unordered(width)
            .filter_map(|(result, id)| async move {
                result
                    .map_err(|err| warn!(restaurant = %id, error = %err, "restaurant fetch failed"))
                    .ok()
                    .flatten()
            })
            .collect()
            .await
    }

    /// Restaurants whose name starts with `prefix`, alphabetically
    #[instrument(skip(self))]
    pub async fn search_by_name(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Restaurant>, PlatefulError> {
        let prefix = normalize_search(prefix);
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let query = Query::collection(collections::RESTAURANTS)
            .filter(Filter::gte(restaurant::SEARCH_NAME, prefix.as_str()))
            .filter(Filter::lt(restaurant::SEARCH_NAME, prefix_upper_bound(&prefix)))
            .order_by(OrderBy::Field(
                restaurant::SEARCH_NAME.into(),
                Direction::Ascending,
            ))
            .limit(limit.min(self.ctx.config().search.max_results));
        let docs = self.ctx.store().query(&query).await?;
        Ok(docs.iter().map(decode).collect())
    }

    /// Restaurants matching every given criterion, cheapest first
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filter: &RestaurantFilter,
        limit: usize,
    ) -> Result<Vec<Restaurant>, PlatefulError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut query = Query::collection(collections::RESTAURANTS);
        if let Some(city) = &filter.city {
            query = query.filter(Filter::equals(restaurant::CITY_KEY, normalize_search(city)));
        }
        if let Some(cuisine) = &filter.cuisine {
            query = query.filter(Filter::equals(
                restaurant::CUISINE_KEY,
                normalize_search(cuisine),
            ));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(Filter::lte(restaurant::PRICE_LEVEL, max));
        }
        let query = query
            .order_by(OrderBy::Field(
                restaurant::PRICE_LEVEL.into(),
                Direction::Ascending,
            ))
            .limit(limit.min(self.ctx.config().search.max_results));
        let docs = self.ctx.store().query(&query).await?;
        Ok(docs.iter().map(decode).collect())
    }

    /// Set the cover photo reference
    #[instrument(skip(self))]
    pub async fn attach_photo(&self, id: &RestaurantId, photo: &str) -> Result<(), PlatefulError> {
        self.ctx.require_actor()?;
        let photo = photo.trim();
        if photo.is_empty() {
            return Err(PlatefulError::validation("photo reference is required"));
        }
        self.ctx
            .store()
            .update(
                collections::RESTAURANTS,
                id.as_str(),
                vec![FieldUpdate::set(restaurant::COVER_IMAGE, photo)],
            )
            .await?;
        Ok(())
    }

    /// Aggregate the current reviews of a restaurant
    pub async fn score_summary(&self, id: &RestaurantId) -> Result<ScoreSummary, PlatefulError> {
        let query = Query::collection(collections::REVIEWS)
            .filter(Filter::equals(review::RESTAURANT_ID, id.as_str()));
        let docs = self.ctx.store().query(&query).await?;
        let reviews: Vec<Review> = docs
            .iter()
            .map(|d| Review::from_document(d).into_value())
            .collect();
        Ok(ScoreSummary::from_reviews(&reviews))
    }

    /// Recompute aggregates and store them on the restaurant
    #[instrument(skip(self))]
    pub async fn refresh_aggregates(
        &self,
        id: &RestaurantId,
    ) -> Result<ScoreSummary, PlatefulError> {
        let summary = self.score_summary(id).await?;
        let average = |field: &str, value: Option<f64>| match value {
            Some(v) => FieldUpdate::set(field, v),
            None => FieldUpdate::delete(field),
        };
        self.ctx
            .store()
            .update(
                collections::RESTAURANTS,
                id.as_str(),
                vec![
                    FieldUpdate::set(restaurant::REVIEW_COUNT, summary.review_count),
                    average(restaurant::AVG_FOOD, summary.avg_food_score),
                    average(restaurant::AVG_SERVICE, summary.avg_service_score),
                ],
            )
            .await?;
        Ok(summary)
    }
}

fn decode(doc: &Document) -> Restaurant {
    let decoded = Restaurant::from_document(doc);
    if !decoded.is_complete() {
        debug!(restaurant = %doc.id, defaulted = ?decoded.defaulted, "partial restaurant");
    }
    decoded.into_value()
}
