//! Identifier and value types
//!
//! Document IDs are opaque strings chosen by the identity provider (users),
//! derived from normalized content (restaurants) or assigned by the store
//! (reviews, lists, events). Each gets its own newtype so they cannot be
//! mixed up at call sites.

use crate::error::PlatefulError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw document ID
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Raw document ID
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

document_id!(
    /// User ID, issued by the identity provider
    UserId
);
document_id!(
    /// Restaurant ID, the normalized `name|address` key
    RestaurantId
);
document_id!(
    /// Review ID, store-assigned
    ReviewId
);
document_id!(
    /// Restaurant list ID, store-assigned
    ListId
);
document_id!(
    /// Activity event ID, store-assigned
    EventId
);

/// A review score: 0 to 5 in half-point steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score {
    halves: u8,
}

impl Score {
    /// Highest possible score
    pub const MAX: f64 = 5.0;

    /// Validate a raw score
    ///
    /// # Errors
    /// `PlatefulError::Validation` when out of range or not a half step.
    pub fn new(value: f64) -> Result<Self, PlatefulError> {
        if !value.is_finite() || !(0.0..=Self::MAX).contains(&value) {
            return Err(PlatefulError::validation(format!(
                "score {value} must be between 0 and 5"
            )));
        }
        let doubled = value * 2.0;
        if doubled.fract() != 0.0 {
            return Err(PlatefulError::validation(format!(
                "score {value} must be a whole or half point"
            )));
        }
        // doubled is an integer in 0..=10
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self {
            halves: doubled as u8,
        })
    }

    /// Score as a number
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.halves) / 2.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

/// Restaurant price level, `$` to `$$$$`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriceLevel(u8);

impl PriceLevel {
    /// Validate a raw price level
    ///
    /// # Errors
    /// `PlatefulError::Validation` unless `1..=4`.
    pub fn new(level: u8) -> Result<Self, PlatefulError> {
        if (1..=4).contains(&level) {
            Ok(Self(level))
        } else {
            Err(PlatefulError::validation(format!(
                "price level {level} must be between 1 and 4"
            )))
        }
    }

    /// Raw level
    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PriceLevel {
    type Error = PlatefulError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<PriceLevel> for u8 {
    fn from(level: PriceLevel) -> Self {
        level.0
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&"$".repeat(usize::from(self.0)))
    }
}

/// What an activity event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    /// Actor liked a restaurant
    LikedRestaurant,
    /// Actor liked a review
    LikedReview,
    /// Actor published a review
    CreatedReview,
}

impl ActivityKind {
    /// Stored representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LikedRestaurant => "liked-restaurant",
            Self::LikedReview => "liked-review",
            Self::CreatedReview => "created-review",
        }
    }

    /// Parse the stored representation
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "liked-restaurant" => Some(Self::LikedRestaurant),
            "liked-review" => Some(Self::LikedReview),
            "created-review" => Some(Self::CreatedReview),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_accept_half_steps_only() {
        assert_eq!(Score::new(4.5).unwrap().value(), 4.5);
        assert_eq!(Score::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Score::new(5.0).unwrap().to_string(), "5.0");
        assert!(Score::new(4.25).is_err());
        assert!(Score::new(5.5).is_err());
        assert!(Score::new(-0.5).is_err());
        assert!(Score::new(f64::NAN).is_err());
    }

    #[test]
    fn price_levels_are_one_to_four() {
        assert_eq!(PriceLevel::new(3).unwrap().to_string(), "$$$");
        assert!(PriceLevel::new(0).is_err());
        assert!(PriceLevel::new(5).is_err());
        assert!(serde_json::from_str::<PriceLevel>("9").is_err());
    }

    #[test]
    fn activity_kinds_round_trip_through_storage_names() {
        for kind in [
            ActivityKind::LikedRestaurant,
            ActivityKind::LikedReview,
            ActivityKind::CreatedReview,
        ] {
            assert_eq!(ActivityKind::parse(kind.as_str()), Some(kind));
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.as_str().into())
            );
        }
        assert_eq!(ActivityKind::parse("poked"), None);
    }

    #[test]
    fn ids_display_raw_value() {
        let id = UserId::new("u-1");
        assert_eq!(id.to_string(), "u-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u-1\"");
    }
}
