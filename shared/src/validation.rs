//! Input validation for stock operations

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Quantity Validations
// ============================================================================

/// Decimal places stored for quantities
pub const QUANTITY_SCALE: u32 = 3;
/// Decimal places stored for costs
pub const COST_SCALE: u32 = 4;

/// Reject values with more decimal places than the column keeps.
/// Trailing zeros do not count.
pub fn validate_scale(field: &str, value: Decimal, max_scale: u32) -> DomainResult<()> {
    if value.normalize().scale() > max_scale {
        return Err(DomainError::validation(
            field,
            format!("must have at most {} decimal places", max_scale),
        ));
    }
    Ok(())
}

/// Quantities may be zero but never negative
pub fn validate_non_negative(field: &str, value: Decimal) -> DomainResult<()> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(field, "cannot be negative"));
    }
    validate_scale(field, value, QUANTITY_SCALE)
}

pub fn validate_positive(field: &str, value: Decimal) -> DomainResult<()> {
    if value <= Decimal::ZERO {
        return Err(DomainError::validation(field, "must be greater than zero"));
    }
    validate_scale(field, value, QUANTITY_SCALE)
}

pub fn validate_cost(field: &str, value: Decimal) -> DomainResult<()> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(field, "cannot be negative"));
    }
    validate_scale(field, value, COST_SCALE)
}

/// Minimum threshold is non-negative and, when a maximum is set, not above it
pub fn validate_thresholds(min: Decimal, max: Option<Decimal>) -> DomainResult<()> {
    validate_non_negative("min_threshold", min)?;
    if let Some(max) = max {
        validate_non_negative("max_threshold", max)?;
        if max < min {
            return Err(DomainError::validation(
                "max_threshold",
                "must not be below min_threshold",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

pub fn validate_item_name(name: &str) -> DomainResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name", "is required"));
    }
    if trimmed.chars().count() > 200 {
        return Err(DomainError::validation("name", "must be at most 200 characters"));
    }
    Ok(())
}

/// Parse an operating day in `YYYY-MM-DD` form
pub fn parse_operating_date(value: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::validation("date", "expected YYYY-MM-DD"))
}
