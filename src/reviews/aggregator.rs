use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::reviews::{ReviewError, ReviewStore, ReviewTally};

/// Keeps a product's rating and review references in step with its reviews
///
/// Every recompute rebuilds both from the reviews table, so a summary left
/// behind by a failed write is corrected by the next one. Called explicitly
/// from every review write; nothing recomputes implicitly.
#[derive(Clone)]
pub struct ReviewAggregator {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
}

/// Rebuilt product-side view of its reviews
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    /// Every review, hidden ones included, oldest first
    pub review_ids: Vec<Uuid>,
    /// Mean over visible reviews only
    pub rating: f64,
}

impl ReviewSummary {
    pub fn of(tally: &[ReviewTally]) -> Self {
        let visible: Vec<i16> = tally.iter().filter(|r| r.is_visible).map(|r| r.rating).collect();
        Self {
            review_ids: tally.iter().map(|r| r.id).collect(),
            rating: ReviewAggregator::mean(&visible),
        }
    }
}

impl ReviewAggregator {
    pub fn new(reviews: Arc<dyn ReviewStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { reviews, catalog }
    }

    /// Arithmetic mean of the ratings, 0 when there are none
    pub fn mean(ratings: &[i16]) -> f64 {
        if ratings.is_empty() {
            return 0.0;
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        sum as f64 / ratings.len() as f64
    }

    /// Rebuild the product's review references and rating from its reviews
    pub async fn recompute(&self, product_id: Uuid) -> Result<ReviewSummary, ReviewError> {
        let tally = self.reviews.tally(product_id).await?;
        let summary = ReviewSummary::of(&tally);

        if !self
            .catalog
            .set_review_summary(product_id, &summary.review_ids, summary.rating)
            .await?
        {
            warn!("Product {} vanished before its rating could be updated", product_id);
        }
        debug!(
            "Product {} rated {:.2} over {} reviews",
            product_id,
            summary.rating,
            summary.review_ids.len()
        );
        Ok(summary)
    }
}
