//! Recipe availability tests
//!
//! Substitution of expired or short rows by same-name alternates, and the
//! overall availability verdict.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    resolve_availability, AvailabilityStatus, DomainError, IngredientCategory, MissingReason,
    RecipeIngredient, StockItem, StockStatus, StorageCondition, Unit,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn row(name: &str, stock: &str, min: &str, unit: Unit, expiry: Option<DateTime<Utc>>) -> StockItem {
    let now = Utc::now();
    StockItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: IngredientCategory::Vegetables,
        unit,
        storage_condition: StorageCondition::Fridge,
        supplier: None,
        initial_quantity: dec(stock),
        current_stock: dec(stock),
        cost: None,
        min_threshold: dec(min),
        max_threshold: None,
        expiry_date: expiry,
        status: StockStatus::Active,
        notes: None,
        created_by: Uuid::new_v4(),
        last_updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

fn needs(item: &StockItem, quantity: &str) -> RecipeIngredient {
    RecipeIngredient {
        stock_item_id: item.id,
        quantity: dec(quantity),
        unit: item.unit,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Expired spinach is replaced by the fresh spinach row expiring soonest
    #[test]
    fn test_expired_row_substituted_by_soonest_alternate() {
        let now = Utc::now();
        let expired = row("Spinach", "5", "0", Unit::Kg, Some(now - Duration::hours(2)));
        let later = row("Spinach", "9", "0", Unit::Kg, Some(now + Duration::days(4)));
        let sooner = row("Spinach", "3", "0", Unit::Kg, Some(now + Duration::days(1)));
        let stock = vec![expired.clone(), later, sooner.clone()];

        let result = resolve_availability(&[needs(&expired, "1")], 2, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::Available);
        assert_eq!(result.item_substitution_map.get(&expired.id), Some(&sooner.id));
        assert_eq!(result.resolved_id(expired.id), sooner.id);
    }

    /// 2 kg needed, 1 kg on the referenced row, 5 kg on another row of the same name
    #[test]
    fn test_short_row_substituted_and_left_untouched() {
        let now = Utc::now();
        let short = row("Onions", "1", "0", Unit::Kg, None);
        let alternate = row("Onions", "5", "0", Unit::Kg, None);
        let stock = vec![short.clone(), alternate.clone()];

        let result = resolve_availability(&[needs(&short, "2")], 1, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.item_substitution_map.len(), 1);
        assert_eq!(result.item_substitution_map[&short.id], alternate.id);
        // resolution is read-only
        assert_eq!(stock[0].current_stock, dec("1"));
        assert_eq!(stock[1].current_stock, dec("5"));
    }

    /// 1 kg on the referenced row; alternates of 5 kg dated in three days and 5 kg undated
    #[test]
    fn test_undated_alternate_preferred_over_dated() {
        let now = Utc::now();
        let short = row("Shallots", "1", "0", Unit::Kg, None);
        let dated = row("Shallots", "5", "0", Unit::Kg, Some(now + Duration::days(3)));
        let undated = row("Shallots", "5", "0", Unit::Kg, None);
        let stock = vec![short.clone(), dated, undated.clone()];

        let result = resolve_availability(&[needs(&short, "2")], 1, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.resolved_id(short.id), undated.id);
    }

    #[test]
    fn test_negative_quantity_is_a_validation_error() {
        let now = Utc::now();
        let empty = row("Capers", "0", "0", Unit::G, None);
        let err = resolve_availability(&[needs(&empty, "-2")], 1, &[empty.clone()], now).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "quantity"));
    }

    /// A row with no minimum threshold never makes the verdict low stock
    #[test]
    fn test_zero_threshold_row_not_low() {
        let now = Utc::now();
        let capers = row("Capers", "0", "0", Unit::G, None);
        let result = resolve_availability(&[needs(&capers, "0")], 1, &[capers.clone()], now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::Available);
    }

    #[test]
    fn test_usable_row_has_no_substitution() {
        let now = Utc::now();
        let rice = row("Rice", "20", "0", Unit::Kg, None);
        let result = resolve_availability(&[needs(&rice, "0.5")], 4, &[rice.clone()], now).unwrap();
        assert!(result.is_available);
        assert!(result.item_substitution_map.is_empty());
        assert_eq!(result.resolved_id(rice.id), rice.id);
    }

    #[test]
    fn test_alternate_with_matching_unit_preferred() {
        let now = Utc::now();
        let short = row("Milk", "0.2", "0", Unit::Ltr, None);
        let in_ml = row("Milk", "900", "0", Unit::Ml, Some(now + Duration::hours(5)));
        let in_ltr = row("Milk", "4", "0", Unit::Ltr, Some(now + Duration::days(3)));
        let stock = vec![short.clone(), in_ml, in_ltr.clone()];

        let result = resolve_availability(&[needs(&short, "1")], 1, &stock, now).unwrap();
        assert_eq!(result.resolved_id(short.id), in_ltr.id);
    }

    #[test]
    fn test_expired_without_alternates_is_missing() {
        let now = Utc::now();
        let basil = row("Basil", "2", "0", Unit::G, Some(now - Duration::minutes(1)));

        let result = resolve_availability(&[needs(&basil, "1")], 1, &[basil.clone()], now).unwrap();
        assert!(!result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::OutOfStock);
        let missing = &result.missing_ingredients[0];
        assert_eq!(missing.reason, MissingReason::ExpiredNoAlternatives);
        assert_eq!(missing.reason.message(), "expired, no alternatives");
        assert_eq!(missing.name.as_deref(), Some("Basil"));
    }

    #[test]
    fn test_unknown_ingredient_is_not_found() {
        let now = Utc::now();
        let ghost = RecipeIngredient {
            stock_item_id: Uuid::new_v4(),
            quantity: dec("1"),
            unit: Unit::Pcs,
        };
        let result = resolve_availability(&[ghost.clone()], 1, &[], now).unwrap();
        assert_eq!(result.missing_ingredients[0].reason, MissingReason::NotFound);
        assert_eq!(result.missing_ingredients[0].stock_item_id, ghost.stock_item_id);
    }

    #[test]
    fn test_multiplier_scales_requirement() {
        let now = Utc::now();
        let eggs = row("Eggs", "10", "0", Unit::Pcs, None);

        let enough = resolve_availability(&[needs(&eggs, "2")], 5, &[eggs.clone()], now).unwrap();
        assert!(enough.is_available);

        let short = resolve_availability(&[needs(&eggs, "2")], 6, &[eggs.clone()], now).unwrap();
        assert!(!short.is_available);
        assert_eq!(short.missing_ingredients[0].required, dec("12"));
        assert_eq!(short.missing_ingredients[0].available, dec("10"));
        assert_eq!(short.missing_ingredients[0].reason, MissingReason::InsufficientQuantity);
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        let now = Utc::now();
        let eggs = row("Eggs", "10", "0", Unit::Pcs, None);
        let err = resolve_availability(&[needs(&eggs, "1")], 0, &[eggs.clone()], now).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_low_stock_verdict_when_at_threshold() {
        let now = Utc::now();
        let flour = row("Flour", "5", "5", Unit::Kg, None);
        let result = resolve_availability(&[needs(&flour, "1")], 1, &[flour.clone()], now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::LowStock);
    }

    #[test]
    fn test_empty_recipe_is_available() {
        let result = resolve_availability(&[], 1, &[], Utc::now()).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::Available);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Available exactly when every line is covered by an unexpired row
        #[test]
        fn prop_single_line_verdict(
            stock in 0i64..1_000i64,
            per_unit in 1i64..100i64,
            multiplier in 1u32..20u32
        ) {
            let now = Utc::now();
            let item = StockItem {
                current_stock: Decimal::from(stock),
                ..row("Potatoes", "0", "0", Unit::Kg, None)
            };
            let line = RecipeIngredient {
                stock_item_id: item.id,
                quantity: Decimal::from(per_unit),
                unit: Unit::Kg,
            };

            let result = resolve_availability(&[line], multiplier, &[item], now).unwrap();
            let required = per_unit * i64::from(multiplier);
            prop_assert_eq!(result.is_available, stock >= required);
            prop_assert_eq!(result.is_available, result.missing_ingredients.is_empty());
            prop_assert!(result.item_substitution_map.is_empty());
        }
    }
}
