//! Owner-curated restaurant lists

use crate::context::Plateful;
use crate::error::PlatefulError;
use crate::model::{fields, RestaurantList};
use crate::schema::{collections, list};
use crate::types::{ListId, RestaurantId, UserId};
use plateful_store::{
    document_path, Direction, Document, FieldUpdate, Filter, FromDocument, OrderBy, Query,
};
use serde_json::json;
use tracing::{info, instrument};

fn required_name(name: &str) -> Result<&str, PlatefulError> {
    let name = name.trim();
    if name.is_empty() {
        Err(PlatefulError::validation("list name is required"))
    } else {
        Ok(name)
    }
}

/// Restaurant list service
#[derive(Debug, Clone)]
pub struct ListService {
    ctx: Plateful,
}

impl ListService {
    /// Create a service over `ctx`
    #[must_use]
    pub fn new(ctx: Plateful) -> Self {
        Self { ctx }
    }

    /// Create an empty list owned by the signed-in user
    #[instrument(skip(self, description))]
    pub async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<RestaurantList, PlatefulError> {
        let owner = self.ctx.require_actor()?;
        let name = required_name(name)?;
        let mut record = fields([
            (list::NAME, json!(name)),
            (list::OWNER_ID, json!(owner.as_str())),
            (list::RESTAURANT_IDS, json!([])),
        ]);
        if let Some(text) = description.map(str::trim).filter(|d| !d.is_empty()) {
            record.insert(list::DESCRIPTION.into(), json!(text));
        }
        let doc = self.ctx.store().add(collections::LISTS, record).await?;
        info!(list = %doc.id, owner = %owner, "list created");
        Ok(decode(&doc))
    }

    /// Fetch a list
    ///
    /// # Errors
    /// `PlatefulError::NotFound` when absent.
    pub async fn get(&self, id: &ListId) -> Result<RestaurantList, PlatefulError> {
        let doc = self
            .ctx
            .store()
            .get(collections::LISTS, id.as_str())
            .await?
            .ok_or_else(|| PlatefulError::NotFound(document_path(collections::LISTS, id.as_str())))?;
        Ok(decode(&doc))
    }

    /// Lists owned by `owner`, newest first
    pub async fn lists_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<RestaurantList>, PlatefulError> {
        let query = Query::collection(collections::LISTS)
            .filter(Filter::equals(list::OWNER_ID, owner.as_str()))
            .order_by(OrderBy::CreateTime(Direction::Descending));
        let docs = self.ctx.store().query(&query).await?;
        Ok(docs.iter().map(decode).collect())
    }

    /// Add an existing restaurant; adding a member again is a no-op
    #[instrument(skip(self))]
    pub async fn add_restaurant(
        &self,
        id: &ListId,
        restaurant: &RestaurantId,
    ) -> Result<(), PlatefulError> {
        self.owned(id).await?;
        self.ctx.restaurants().get(restaurant).await?;
        self.ctx
            .store()
            .update_array_union(
                collections::LISTS,
                id.as_str(),
                list::RESTAURANT_IDS,
                vec![restaurant.as_str().into()],
            )
            .await?;
        Ok(())
    }

    /// Remove a restaurant; removing a non-member is a no-op
    #[instrument(skip(self))]
    pub async fn remove_restaurant(
        &self,
        id: &ListId,
        restaurant: &RestaurantId,
    ) -> Result<(), PlatefulError> {
        self.owned(id).await?;
        self.ctx
            .store()
            .update_array_remove(
                collections::LISTS,
                id.as_str(),
                list::RESTAURANT_IDS,
                vec![restaurant.as_str().into()],
            )
            .await?;
        Ok(())
    }

    /// Change title and description; `None` description clears it
    #[instrument(skip(self, description))]
    pub async fn rename(
        &self,
        id: &ListId,
        name: &str,
        description: Option<&str>,
    ) -> Result<RestaurantList, PlatefulError> {
        self.owned(id).await?;
        let name = required_name(name)?;
        let description = match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(text) => FieldUpdate::set(list::DESCRIPTION, text),
            None => FieldUpdate::delete(list::DESCRIPTION),
        };
        self.ctx
            .store()
            .update(
                collections::LISTS,
                id.as_str(),
                vec![FieldUpdate::set(list::NAME, name), description],
            )
            .await?;
        self.get(id).await
    }

    /// Delete a list
    #[instrument(skip(self))]
    pub async fn delete_list(&self, id: &ListId) -> Result<(), PlatefulError> {
        self.owned(id).await?;
        self.ctx.store().delete(collections::LISTS, id.as_str()).await?;
        info!(list = %id, "list deleted");
        Ok(())
    }

    async fn owned(&self, id: &ListId) -> Result<RestaurantList, PlatefulError> {
        let actor = self.ctx.require_actor()?;
        let found = self.get(id).await?;
        if found.owner_id != actor {
            return Err(PlatefulError::PermissionDenied(format!(
                "{actor} does not own list {id}"
            )));
        }
        Ok(found)
    }
}

fn decode(doc: &Document) -> RestaurantList {
    RestaurantList::from_document(doc).into_value()
}
