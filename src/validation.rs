// Validation utilities module
// Custom validator functions for money, percentages and free text

use rust_decimal::Decimal;
use validator::ValidationError;

/// Money and percentage columns are NUMERIC(_, 2)
const MAX_SCALE: u32 = 2;

/// Validates that a price is strictly positive, in whole cents
pub fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        Err(ValidationError::new("price_must_be_positive"))
    } else if price.normalize().scale() > MAX_SCALE {
        Err(ValidationError::new("too_many_decimal_places"))
    } else {
        Ok(())
    }
}

/// Validates that an amount is zero or positive
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates that a discount percentage lies in 0..=100 with at most two decimals
pub fn validate_percentage(percentage: &Decimal) -> Result<(), ValidationError> {
    if *percentage < Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED {
        Err(ValidationError::new("percentage_out_of_range"))
    } else if percentage.normalize().scale() > MAX_SCALE {
        Err(ValidationError::new("too_many_decimal_places"))
    } else {
        Ok(())
    }
}

/// Validates that a string carries more than whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates a short locale tag such as `en` or `pt-BR`
pub fn validate_locale(locale: &str) -> Result<(), ValidationError> {
    let well_formed = (2..=8).contains(&locale.len())
        && locale.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_locale"))
    }
}
