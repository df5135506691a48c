//! Collection and field names of the stored documents

/// Collection names
pub mod collections {
    /// User profiles, keyed by identity-provider ID
    pub const USERS: &str = "users";
    /// Restaurants, keyed by normalized `name|address`
    pub const RESTAURANTS: &str = "restaurants";
    /// Reviews, store-assigned IDs
    pub const REVIEWS: &str = "reviews";
    /// Append-only activity events
    pub const ACTIVITIES: &str = "activities";
    /// Curated restaurant lists
    pub const LISTS: &str = "lists";
}

/// User profile fields
pub mod user {
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const EMAIL: &str = "email";
    pub const PROFILE_IMAGE: &str = "profileImage";
    pub const BIO: &str = "bio";
    pub const LEVEL: &str = "level";
    pub const POSTAL_CODE: &str = "postalCode";
    pub const SEARCH_NAME: &str = "searchName";
    pub const FOLLOWERS: &str = "followers";
    pub const FOLLOWING: &str = "following";
    pub const LIKED_RESTAURANTS: &str = "likedRestaurants";
    pub const LIKED_REVIEWS: &str = "likedReviews";
}

/// Restaurant fields
pub mod restaurant {
    pub const NAME: &str = "name";
    pub const ADDRESS: &str = "address";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const ZIP: &str = "zip";
    pub const CUISINE: &str = "cuisine";
    pub const PRICE_LEVEL: &str = "priceLevel";
    pub const COVER_IMAGE: &str = "coverImage";
    pub const REVIEW_COUNT: &str = "reviewCount";
    pub const AVG_FOOD: &str = "avgFoodScore";
    pub const AVG_SERVICE: &str = "avgServiceScore";
    pub const SEARCH_NAME: &str = "searchName";
    pub const CITY_KEY: &str = "cityKey";
    pub const CUISINE_KEY: &str = "cuisineKey";
}

/// Review fields
pub mod review {
    pub const RESTAURANT_ID: &str = "restaurantId";
    pub const AUTHOR_ID: &str = "authorId";
    pub const FOOD_SCORE: &str = "foodScore";
    pub const SERVICE_SCORE: &str = "serviceScore";
    pub const FOOD_TEXT: &str = "foodText";
    pub const SERVICE_TEXT: &str = "serviceText";
    pub const MEDIA: &str = "media";
    pub const TAGS: &str = "tags";
    pub const VISIT_DATE: &str = "visitDate";
    pub const LIKE_COUNT: &str = "likeCount";
}

/// Activity event fields
pub mod activity {
    pub const ACTOR_ID: &str = "actorId";
    pub const KIND: &str = "kind";
    pub const RESTAURANT_ID: &str = "restaurantId";
    pub const RESTAURANT_NAME: &str = "restaurantName";
    pub const REVIEW_ID: &str = "reviewId";
}

/// Restaurant list fields
pub mod list {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const OWNER_ID: &str = "ownerId";
    pub const RESTAURANT_IDS: &str = "restaurantIds";
}
