use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::coupons::{Coupon, CouponError, CouponQuote, CouponRejection, CouponStore, CouponValidation};

/// Customer-facing coupon checks shared by the coupon endpoints and checkout
#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
}

impl CouponService {
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Report whether `code` can be applied right now; never an error for a bad code
    pub async fn validate(&self, code: &str) -> Result<CouponValidation, CouponError> {
        match self.usable(code, Utc::now()).await {
            Ok(coupon) => Ok(CouponValidation::accepted(coupon)),
            Err(CouponError::Rejected(reason)) => {
                debug!("Coupon {} rejected: {}", code, reason.message());
                Ok(CouponValidation::rejected(reason))
            }
            Err(err) => Err(err),
        }
    }

    /// Discount `code` gives on `total`
    pub async fn quote(&self, code: &str, total: Decimal) -> Result<CouponQuote, CouponError> {
        if total <= Decimal::ZERO {
            return Err(CouponError::InvalidTotal);
        }
        let coupon = self.usable(code, Utc::now()).await?;
        Ok(CouponQuote::for_total(&coupon, total))
    }

    /// The coupon behind `code` if it is usable at `now`
    pub async fn usable(&self, code: &str, now: DateTime<Utc>) -> Result<Coupon, CouponError> {
        let coupon = self
            .store
            .find_by_code(code)
            .await?
            .ok_or(CouponError::Rejected(CouponRejection::NotFound))?;
        coupon.check(now).map_err(CouponError::Rejected)?;
        Ok(coupon)
    }
}
