//! Stock ledger tests
//!
//! Covers the ledger arithmetic and status derivation that every stock
//! mutation goes through:
//! - current stock never goes negative
//! - current stock equals initial + added - deducted
//! - status ordering: out of stock, then expired, then low stock

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_delta, compute_status, DomainError, IngredientCategory, NewStockItem, StockItem,
    StockStatus, StorageCondition, Unit,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn new_item(name: &str, initial: &str, min: &str) -> NewStockItem {
    NewStockItem {
        name: name.to_string(),
        category: IngredientCategory::Vegetables,
        unit: Unit::Kg,
        storage_condition: StorageCondition::Fridge,
        supplier: Some("Market Hall".to_string()),
        initial_quantity: dec(initial),
        cost: Some(dec("2.40")),
        min_threshold: dec(min),
        max_threshold: None,
        expiry_date: None,
        freshness: None,
        notes: None,
    }
}

fn create(name: &str, initial: &str, min: &str, now: DateTime<Utc>) -> StockItem {
    new_item(name, initial, min)
        .into_item(Uuid::new_v4(), Uuid::new_v4(), now)
        .unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Tomatoes: 10 kg, threshold 5, deduct 7 then 3
    #[test]
    fn test_tomatoes_walkthrough() {
        let now = Utc::now();
        let cook = Uuid::new_v4();
        let mut tomatoes = create("Tomatoes", "10", "5", now);
        assert_eq!(tomatoes.status, StockStatus::Active);
        assert_eq!(tomatoes.current_stock, dec("10"));

        tomatoes.adjust(dec("-7"), cook, now).unwrap();
        assert_eq!(tomatoes.current_stock, dec("3"));
        assert_eq!(tomatoes.status, StockStatus::LowStock);
        assert_eq!(tomatoes.last_updated_by, Some(cook));

        tomatoes.adjust(dec("-3"), cook, now).unwrap();
        assert_eq!(tomatoes.current_stock, Decimal::ZERO);
        assert_eq!(tomatoes.status, StockStatus::OutOfStock);

        // initial quantity is historical only
        assert_eq!(tomatoes.initial_quantity, dec("10"));
    }

    #[test]
    fn test_over_deduction_is_rejected_with_amounts() {
        let err = apply_delta("Basil", dec("2"), dec("-2.5")).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                item,
                requested,
                available,
            } => {
                assert_eq!(item, "Basil");
                assert_eq!(requested, dec("2.5"));
                assert_eq!(available, dec("2"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_deduct_to_exactly_zero_is_allowed() {
        assert_eq!(apply_delta("Basil", dec("2"), dec("-2")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_restock_clears_out_of_stock() {
        let now = Utc::now();
        let mut milk = create("Milk", "0", "2", now);
        assert_eq!(milk.status, StockStatus::OutOfStock);

        milk.adjust(dec("1"), Uuid::new_v4(), now).unwrap();
        assert_eq!(milk.status, StockStatus::LowStock);

        milk.adjust(dec("6"), Uuid::new_v4(), now).unwrap();
        assert_eq!(milk.status, StockStatus::Active);
    }

    #[test]
    fn test_expired_item_with_stock_is_expired_not_low() {
        let now = Utc::now();
        let mut cream = create("Cream", "1", "5", now);
        cream.expiry_date = Some(now - Duration::minutes(5));
        assert_eq!(cream.derived_status(now), StockStatus::Expired);
    }

    #[test]
    fn test_expiry_exactly_now_is_not_expired() {
        let now = Utc::now();
        assert_eq!(
            compute_status(dec("4"), Decimal::ZERO, Some(now), now),
            StockStatus::Active
        );
    }

    /// Lettuce logged with neither an expiry date nor a freshness grade
    #[test]
    fn test_vegetable_without_freshness_gets_category_shelf_life() {
        let now = Utc::now();
        let lettuce = create("Lettuce", "12", "0", now);
        assert_eq!(lettuce.expiry_date, Some(now + Duration::days(4)));

        let mut seafood = new_item("Mussels", "3", "0");
        seafood.category = IngredientCategory::Seafood;
        let mussels = seafood.into_item(Uuid::new_v4(), Uuid::new_v4(), now).unwrap();
        assert_eq!(mussels.expiry_date, Some(now + Duration::days(1)));
    }

    #[test]
    fn test_quantity_finer_than_stored_scale_rejected() {
        let result = new_item("Saffron", "0.0004", "0").validate();
        assert!(matches!(
            result,
            Err(DomainError::Validation { ref field, .. }) if field == "initial_quantity"
        ));
        assert!(new_item("Saffron", "0.004", "0").validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let now = Utc::now();
        let result = new_item("   ", "1", "0").into_item(Uuid::new_v4(), Uuid::new_v4(), now);
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_max_below_min_rejected() {
        let mut input = new_item("Onions", "10", "5");
        input.max_threshold = Some(dec("4"));
        assert!(input.validate().is_err());

        input.max_threshold = Some(dec("5"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_discontinued_survives_adjustments() {
        let now = Utc::now();
        let mut item = create("Truffle", "3", "0", now);
        item.status = StockStatus::Discontinued;
        item.adjust(dec("-3"), Uuid::new_v4(), now).unwrap();
        assert_eq!(item.status, StockStatus::Discontinued);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn delta_strategy() -> impl Strategy<Value = Decimal> {
        (-10_000i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Stock never goes negative, whatever sequence of adjustments is attempted
        #[test]
        fn prop_stock_never_negative(
            initial in quantity_strategy(),
            deltas in prop::collection::vec(delta_strategy(), 1..30)
        ) {
            let now = Utc::now();
            let mut item = create("Carrots", "0", "1", now);
            item.adjust(initial, Uuid::new_v4(), now).unwrap();

            for delta in deltas {
                let before = item.current_stock;
                match item.adjust(delta, Uuid::new_v4(), now) {
                    Ok(()) => prop_assert_eq!(item.current_stock, before + delta),
                    Err(_) => {
                        prop_assert!(before + delta < Decimal::ZERO);
                        prop_assert_eq!(item.current_stock, before);
                    }
                }
                prop_assert!(item.current_stock >= Decimal::ZERO);
            }
        }

        /// Stock equals initial + accepted additions - accepted deductions
        #[test]
        fn prop_stock_balance(
            initial in quantity_strategy(),
            adds in prop::collection::vec(quantity_strategy(), 0..10),
            deducts in prop::collection::vec(quantity_strategy(), 0..10)
        ) {
            let now = Utc::now();
            let mut item = create("Leeks", "0", "0", now);
            item.adjust(initial, Uuid::new_v4(), now).unwrap();

            let mut added = Decimal::ZERO;
            let mut deducted = Decimal::ZERO;
            for qty in &adds {
                item.adjust(*qty, Uuid::new_v4(), now).unwrap();
                added += qty;
            }
            for qty in &deducts {
                if item.adjust(-*qty, Uuid::new_v4(), now).is_ok() {
                    deducted += qty;
                }
            }

            prop_assert_eq!(item.current_stock, initial + added - deducted);
        }

        /// Status always matches the pure rule after a mutation
        #[test]
        fn prop_status_follows_stock(
            stock in 0i64..2_000i64,
            min in 0i64..1_000i64
        ) {
            let now = Utc::now();
            let status = compute_status(Decimal::from(stock), Decimal::from(min), None, now);
            let expected = if stock == 0 {
                StockStatus::OutOfStock
            } else if min > 0 && stock <= min {
                StockStatus::LowStock
            } else {
                StockStatus::Active
            };
            prop_assert_eq!(status, expected);
        }
    }
}
