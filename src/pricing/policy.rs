use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How long a product stays "new" after it is created or re-flagged
pub const NOVELTY_PERIOD_HOURS: i64 = 24;

/// Result of evaluating a discount window at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountEvaluation {
    pub is_active: bool,
    /// Price after discount; zero whenever the discount is inactive
    pub discounted_price: Decimal,
}

impl DiscountEvaluation {
    pub const INACTIVE: DiscountEvaluation = DiscountEvaluation {
        is_active: false,
        discounted_price: Decimal::ZERO,
    };
}

/// Pure pricing rules for discount and novelty flags
///
/// Percentages outside 0..=100 are rejected by request validation before
/// they reach this type.
pub struct PricingPolicy;

impl PricingPolicy {
    /// Evaluate a product discount at `now`
    ///
    /// Active iff the percentage is positive and `start <= now <= end`
    /// (both bounds inclusive). A missing bound or a window whose start is
    /// after its end is never active.
    pub fn evaluate_discount(
        base_price: Decimal,
        percentage: Decimal,
        window_start: Option<DateTime<Utc>>,
        window_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DiscountEvaluation {
        let (start, end) = match (window_start, window_end) {
            (Some(start), Some(end)) => (start, end),
            _ => return DiscountEvaluation::INACTIVE,
        };

        let is_active = percentage > Decimal::ZERO && start <= now && now <= end;
        if !is_active {
            return DiscountEvaluation::INACTIVE;
        }

        DiscountEvaluation {
            is_active: true,
            discounted_price: Self::apply_percentage(base_price, percentage),
        }
    }

    /// `price × (1 − percentage/100)`, rounded to cents like the stored column
    pub fn apply_percentage(price: Decimal, percentage: Decimal) -> Decimal {
        (price * (Decimal::ONE - percentage / Decimal::ONE_HUNDRED))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// A product is new while `now <= new_until`
    pub fn is_new(new_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        matches!(new_until, Some(until) if now <= until)
    }

    /// End of the novelty window for a product flagged new at `flagged_at`
    pub fn novelty_deadline(flagged_at: DateTime<Utc>) -> DateTime<Utc> {
        flagged_at + Duration::hours(NOVELTY_PERIOD_HOURS)
    }

    /// The price a buyer pays right now
    pub fn effective_price(base_price: Decimal, evaluation: &DiscountEvaluation) -> Decimal {
        if evaluation.is_active {
            evaluation.discounted_price
        } else {
            base_price
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// isActive ⇒ discountedPrice = price×(1−pct/100) to the cent; ¬isActive ⇒ discountedPrice = 0
        #[test]
        fn prop_discounted_price_matches_activity(
            price_cents in 1u32..=10_000_000u32,
            pct in 0u32..=100u32,
            start_offset in -10_000i64..10_000,
            end_offset in -10_000i64..10_000,
            has_window in any::<bool>(),
        ) {
            let now = Utc::now();
            let price = Decimal::from(price_cents) / Decimal::ONE_HUNDRED;
            let pct = Decimal::from(pct);
            let (start, end) = if has_window {
                (Some(now + Duration::seconds(start_offset)), Some(now + Duration::seconds(end_offset)))
            } else {
                (None, None)
            };

            let eval = PricingPolicy::evaluate_discount(price, pct, start, end, now);

            if eval.is_active {
                let exact = price * (Decimal::ONE - pct / Decimal::ONE_HUNDRED);
                prop_assert!((eval.discounted_price - exact).abs() <= Decimal::new(5, 3));
                prop_assert!(eval.discounted_price.scale() <= 2);
                prop_assert!(pct > Decimal::ZERO);
                prop_assert!(start_offset <= 0 && end_offset >= 0);
            } else {
                prop_assert_eq!(eval.discounted_price, Decimal::ZERO);
            }
        }

        /// Evaluating twice yields the same result
        #[test]
        fn prop_evaluation_is_deterministic(
            price_cents in 1u32..=1_000_000u32,
            pct in 0u32..=100u32,
            start_offset in -100i64..100,
            end_offset in -100i64..100,
        ) {
            let now = Utc::now();
            let price = Decimal::from(price_cents) / Decimal::ONE_HUNDRED;
            let start = Some(now + Duration::seconds(start_offset));
            let end = Some(now + Duration::seconds(end_offset));
            let first = PricingPolicy::evaluate_discount(price, Decimal::from(pct), start, end, now);
            let second = PricingPolicy::evaluate_discount(price, Decimal::from(pct), start, end, now);
            prop_assert_eq!(first, second);
        }
    }
}
