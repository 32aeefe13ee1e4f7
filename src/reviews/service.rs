use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogStore;
use crate::reviews::{
    CreateReviewRequest, NewReview, Review, ReviewAggregator, ReviewError, ReviewStore, UpdateReviewRequest,
};

/// Service for review business logic
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
    aggregator: ReviewAggregator,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        let aggregator = ReviewAggregator::new(reviews.clone(), catalog.clone());
        Self {
            reviews,
            catalog,
            aggregator,
        }
    }

    /// Create a review
    ///
    /// One review per user and product: a second one is a `Duplicate`, whether
    /// the pre-check or the unique constraint catches it.
    pub async fn create(&self, user_id: Uuid, request: CreateReviewRequest) -> Result<Review, ReviewError> {
        request.validate()?;

        if self.catalog.find_by_id(request.product_id, false).await?.is_none() {
            return Err(ReviewError::ProductNotFound(request.product_id.to_string()));
        }
        if self
            .reviews
            .find_by_user_and_product(user_id, request.product_id)
            .await?
            .is_some()
        {
            return Err(ReviewError::Duplicate);
        }

        let review = self
            .reviews
            .insert(&NewReview {
                user_id,
                product_id: request.product_id,
                rating: request.rating,
                comment: request.comment,
                images: request.images,
            })
            .await?;

        self.refresh_summary(review.product_id).await;
        info!("User {} reviewed product {}", user_id, review.product_id);
        Ok(review)
    }

    /// Update the caller's own review
    pub async fn update(
        &self,
        user_id: Uuid,
        review_id: Uuid,
        request: UpdateReviewRequest,
    ) -> Result<Review, ReviewError> {
        request.validate()?;
        if request.is_empty() {
            return Err(ReviewError::EmptyUpdate);
        }

        let existing = self.owned(review_id, user_id, false).await?;
        let updated = self
            .reviews
            .update(review_id, request.rating, request.comment.as_deref())
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;

        if existing.rating != updated.rating && updated.is_visible {
            self.refresh_summary(updated.product_id).await;
        }
        Ok(updated)
    }

    /// Delete a review; admins may delete anyone's
    pub async fn delete(&self, user_id: Uuid, review_id: Uuid, is_admin: bool) -> Result<(), ReviewError> {
        let review = self.owned(review_id, user_id, is_admin).await?;
        if !self.reviews.delete(review_id).await? {
            return Err(ReviewError::NotFound(review_id));
        }
        self.refresh_summary(review.product_id).await;
        info!("Deleted review {} of product {}", review.id, review.product_id);
        Ok(())
    }

    /// Visible reviews of a live product, newest first
    pub async fn for_product(&self, slug: &str) -> Result<Vec<Review>, ReviewError> {
        let product = self
            .catalog
            .find_by_slug(slug, false)
            .await?
            .ok_or_else(|| ReviewError::ProductNotFound(slug.to_string()))?;
        let reviews = self.reviews.list_visible(product.id).await?;
        debug!("Product {} has {} visible reviews", slug, reviews.len());
        Ok(reviews)
    }

    /// Show or hide a review; the rating only counts visible ones
    pub async fn set_visibility(&self, review_id: Uuid, is_visible: bool) -> Result<Review, ReviewError> {
        let review = self
            .reviews
            .set_visibility(review_id, is_visible)
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;
        self.refresh_summary(review.product_id).await;
        info!("Review {} visibility set to {}", review_id, is_visible);
        Ok(review)
    }

    /// Rebuild the product summary after a committed review write
    ///
    /// A failure leaves the summary stale until the next review write on the
    /// product; the write itself stands.
    async fn refresh_summary(&self, product_id: Uuid) {
        if let Err(err) = self.aggregator.recompute(product_id).await {
            error!("Review summary of product {} is stale: {}", product_id, err);
        }
    }

    async fn owned(&self, review_id: Uuid, user_id: Uuid, is_admin: bool) -> Result<Review, ReviewError> {
        let review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;
        if review.user_id != user_id && !is_admin {
            return Err(ReviewError::Forbidden(review_id));
        }
        Ok(review)
    }
}
