use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Review row
///
/// Only visible reviews count toward the product rating; hidden ones stay in
/// the product's reference set until deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 4)]
    pub rating: i16,
    pub comment: String,
    pub images: Vec<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new review
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub rating: i16,
    #[validate(
        length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"),
        custom = "validate_not_blank"
    )]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Request DTO for updating an existing review
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub rating: Option<i16>,
    #[validate(
        length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"),
        custom = "validate_not_blank"
    )]
    pub comment: Option<String>,
}

impl UpdateReviewRequest {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VisibilityRequest {
    pub is_visible: bool,
}

/// Insert payload assembled by the service
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub images: Vec<String>,
}

/// The parts of a review that feed the product summary
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct ReviewTally {
    pub id: Uuid,
    pub rating: i16,
    pub is_visible: bool,
}
