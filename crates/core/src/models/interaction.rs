//! User interaction events

use crate::error::MarqueeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest rating magnitude accepted; the rating matrix stores `f32`
pub const MAX_RATING_MAGNITUDE: f64 = f32::MAX as f64;

/// One rating event. Append-only; item ids are not checked against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    #[serde(rename = "movie_id", alias = "item_id")]
    pub item_id: String,
    pub rating: f64,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        rating: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
            timestamp,
        }
    }

    /// True if the rating is finite and representable in the rating matrix
    pub fn has_usable_rating(&self) -> bool {
        is_usable_rating(self.rating)
    }
}

fn is_usable_rating(rating: f64) -> bool {
    rating.is_finite() && rating.abs() <= MAX_RATING_MAGNITUDE
}

/// Client-submitted interaction before validation
///
/// Every field is optional at the wire level so that a missing field becomes a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionSubmission {
    pub user_id: Option<String>,
    #[serde(alias = "item_id")]
    pub movie_id: Option<String>,
    pub rating: Option<f64>,
}

impl InteractionSubmission {
    /// Validate presence of all fields and stamp with the server time
    pub fn into_interaction(self, now: DateTime<Utc>) -> Result<Interaction, MarqueeError> {
        let user_id = required_text(self.user_id, "user_id")?;
        let item_id = required_text(self.movie_id, "movie_id")?;
        let rating = self
            .rating
            .ok_or_else(|| MarqueeError::validation_field("rating is required", "rating"))?;

        if !is_usable_rating(rating) {
            return Err(MarqueeError::validation_field(
                format!(
                    "rating must be a finite number no larger than {:e} in magnitude",
                    MAX_RATING_MAGNITUDE
                ),
                "rating",
            ));
        }

        Ok(Interaction::new(user_id, item_id, rating, now))
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, MarqueeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MarqueeError::validation_field(
            format!("{} is required", field),
            field,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(user: Option<&str>, movie: Option<&str>, rating: Option<f64>) -> InteractionSubmission {
        InteractionSubmission {
            user_id: user.map(str::to_string),
            movie_id: movie.map(str::to_string),
            rating,
        }
    }

    #[test]
    fn test_complete_submission_is_accepted() {
        let now = Utc::now();
        let interaction = submission(Some("user1"), Some("m1"), Some(4.0))
            .into_interaction(now)
            .unwrap();

        assert_eq!(interaction.user_id, "user1");
        assert_eq!(interaction.item_id, "m1");
        assert_eq!(interaction.rating, 4.0);
        assert_eq!(interaction.timestamp, now);
    }

    #[test]
    fn test_missing_rating_is_rejected() {
        let err = submission(Some("user1"), Some("m1"), None)
            .into_interaction(Utc::now())
            .unwrap_err();

        match err {
            MarqueeError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("rating")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_user_is_rejected() {
        let err = submission(Some("  "), Some("m1"), Some(1.0))
            .into_interaction(Utc::now())
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_out_of_range_rating_is_rejected() {
        for rating in [1e39, -1e39, f64::MAX] {
            let err = submission(Some("user1"), Some("m1"), Some(rating))
                .into_interaction(Utc::now())
                .unwrap_err();
            match err {
                MarqueeError::Validation { field, .. } => {
                    assert_eq!(field.as_deref(), Some("rating"))
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }

        assert!(submission(Some("user1"), Some("m1"), Some(-2.5))
            .into_interaction(Utc::now())
            .is_ok());
    }

    #[test]
    fn test_usable_rating_bounds() {
        let now = Utc::now();
        assert!(Interaction::new("u", "m", 5.0, now).has_usable_rating());
        assert!(Interaction::new("u", "m", MAX_RATING_MAGNITUDE, now).has_usable_rating());
        assert!(!Interaction::new("u", "m", 1e39, now).has_usable_rating());
        assert!(!Interaction::new("u", "m", f64::NAN, now).has_usable_rating());
    }

    #[test]
    fn test_submission_accepts_item_id_alias() {
        let parsed: InteractionSubmission =
            serde_json::from_str(r#"{"user_id":"u","item_id":"i","rating":3}"#).unwrap();
        assert_eq!(parsed.movie_id.as_deref(), Some("i"));
        assert_eq!(parsed.rating, Some(3.0));
    }
}
