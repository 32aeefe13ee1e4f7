use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Service for calculating line subtotals, order totals and coupon discounts
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate subtotal for a line item
    ///
    /// # Arguments
    /// * `quantity` - Number of units
    /// * `unit_price` - Price per unit frozen at checkout
    pub fn calculate_subtotal(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Calculate total price for an order (sum of all subtotals)
    pub fn calculate_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum()
    }

    /// Amount taken off `total` by a percentage coupon, rounded to cents
    pub fn coupon_discount(total: Decimal, percentage: Decimal) -> Decimal {
        (total * percentage / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Convert a major-unit amount to minor currency units (cents)
    ///
    /// Returns `None` when the amount does not fit in an `i64`.
    pub fn to_minor_units(amount: Decimal) -> Option<i64> {
        (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}
