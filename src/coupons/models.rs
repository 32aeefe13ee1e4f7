use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::pricing::PriceCalculator;

/// Percentage coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    #[schema(example = "SUMMER20")]
    pub code: String,
    #[schema(example = "20")]
    pub percentage: Decimal,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// Stored for reporting; redemptions are not counted against it
    pub max_uses: i32,
    pub created_at: DateTime<Utc>,
}

/// Why a coupon cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    NotFound,
    Inactive,
    Expired,
}

impl CouponRejection {
    pub fn message(&self) -> &'static str {
        match self {
            CouponRejection::NotFound => "Coupon not found",
            CouponRejection::Inactive => "Coupon is inactive",
            CouponRejection::Expired => "Coupon has expired",
        }
    }
}

impl Coupon {
    /// Usable at `now`: active and not past its expiry (expiry instant included)
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if now > self.expires_at {
            return Err(CouponRejection::Expired);
        }
        Ok(())
    }

    /// Discount on `total`, rounded to cents
    pub fn discount_on(&self, total: Decimal) -> Decimal {
        PriceCalculator::coupon_discount(total, self.percentage)
    }
}

/// Response for GET /api/coupons/:code/validate
#[derive(Debug, Serialize, ToSchema)]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
}

impl CouponValidation {
    pub fn accepted(coupon: Coupon) -> Self {
        Self {
            valid: true,
            message: None,
            coupon: Some(coupon),
        }
    }

    pub fn rejected(reason: CouponRejection) -> Self {
        Self {
            valid: false,
            message: Some(reason.message().to_string()),
            coupon: None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteParams {
    /// Order total the coupon applies to
    pub total: Option<Decimal>,
}

/// Response for GET /api/coupons/:code/quote
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CouponQuote {
    pub code: String,
    pub percentage: Decimal,
    pub discount_amount: Decimal,
    pub discounted_total: Decimal,
}

impl CouponQuote {
    pub fn for_total(coupon: &Coupon, total: Decimal) -> Self {
        let discount_amount = coupon.discount_on(total);
        Self {
            code: coupon.code.clone(),
            percentage: coupon.percentage,
            discount_amount,
            discounted_total: total - discount_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(is_active: bool, expires_in: Duration) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE10".into(),
            percentage: dec!(10),
            expires_at: now + expires_in,
            is_active,
            max_uses: 0,
            created_at: now,
        }
    }

    #[test]
    fn test_active_unexpired_coupon_passes() {
        assert_eq!(coupon(true, Duration::hours(1)).check(Utc::now()), Ok(()));
    }

    #[test]
    fn test_inactive_reported_before_expiry() {
        let c = coupon(false, Duration::hours(-1));
        assert_eq!(c.check(Utc::now()), Err(CouponRejection::Inactive));
    }

    #[test]
    fn test_expired_coupon() {
        let c = coupon(true, Duration::hours(-1));
        assert_eq!(c.check(Utc::now()), Err(CouponRejection::Expired));
    }

    #[test]
    fn test_expiry_instant_is_still_valid() {
        let c = coupon(true, Duration::zero());
        assert_eq!(c.check(c.expires_at), Ok(()));
    }

    #[test]
    fn test_quote() {
        let quote = CouponQuote::for_total(&coupon(true, Duration::hours(1)), dec!(59.90));
        assert_eq!(quote.discount_amount, dec!(5.99));
        assert_eq!(quote.discounted_total, dec!(53.91));
    }
}
