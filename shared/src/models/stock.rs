//! Stock ledger models
//!
//! A [`StockItem`] row holds the authoritative current quantity of one
//! ingredient. Its [`StockStatus`] is derived, never stored by callers, and is
//! recomputed with [`compute_status`] at the end of every ledger mutation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::expiry::default_expiry;
use crate::types::{ActorId, Freshness, IngredientCategory, StorageCondition, Unit};
use crate::validation::{
    validate_cost, validate_item_name, validate_non_negative, validate_thresholds,
};

/// One ledger row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub category: IngredientCategory,
    pub unit: Unit,
    pub storage_condition: StorageCondition,
    pub supplier: Option<String>,
    /// Quantity the row was created with (historical reference only)
    pub initial_quantity: Decimal,
    /// Authoritative available quantity, never negative
    pub current_stock: Decimal,
    /// Cost per unit
    pub cost: Option<Decimal>,
    pub min_threshold: Decimal,
    pub max_threshold: Option<Decimal>,
    /// Ledger-level expiry, independent of any batch expiry
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: StockStatus,
    pub notes: Option<String>,
    pub created_by: ActorId,
    pub last_updated_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived ledger status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Active,
    LowStock,
    OutOfStock,
    Expired,
    Discontinued,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Active => "active",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Expired => "expired",
            StockStatus::Discontinued => "discontinued",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(StockStatus::Active),
            "low_stock" => Some(StockStatus::LowStock),
            "out_of_stock" => Some(StockStatus::OutOfStock),
            "expired" => Some(StockStatus::Expired),
            "discontinued" => Some(StockStatus::Discontinued),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `expiry_date` is set and strictly before `now`
pub fn is_past(expiry_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expiry_date, Some(expiry) if expiry < now)
}

/// Pure status rule.
///
/// Order matters: an empty row is `out_of_stock` even when its date has
/// passed, and the expiry check wins over the low-stock check.
pub fn compute_status(
    current_stock: Decimal,
    min_threshold: Decimal,
    expiry_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> StockStatus {
    if current_stock.is_zero() {
        StockStatus::OutOfStock
    } else if is_past(expiry_date, now) {
        StockStatus::Expired
    } else if min_threshold > Decimal::ZERO && current_stock <= min_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::Active
    }
}

/// Ledger arithmetic for `current_stock += delta`.
///
/// Returns the new quantity or [`DomainError::InsufficientStock`] when the
/// result would be negative, in which case nothing changes.
pub fn apply_delta(
    item_name: &str,
    current_stock: Decimal,
    delta: Decimal,
) -> DomainResult<Decimal> {
    let next = current_stock + delta;
    if next < Decimal::ZERO {
        return Err(DomainError::InsufficientStock {
            item: item_name.to_string(),
            requested: -delta,
            available: current_stock,
        });
    }
    Ok(next)
}

impl StockItem {
    /// Status this row should carry at `now`. A discontinued row stays
    /// discontinued until it is explicitly re-enabled.
    pub fn derived_status(&self, now: DateTime<Utc>) -> StockStatus {
        if self.status == StockStatus::Discontinued {
            return StockStatus::Discontinued;
        }
        compute_status(self.current_stock, self.min_threshold, self.expiry_date, now)
    }

    /// Apply a signed adjustment and recompute the status.
    pub fn adjust(
        &mut self,
        delta: Decimal,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.current_stock = apply_delta(&self.name, self.current_stock, delta)?;
        self.status = self.derived_status(now);
        self.last_updated_by = Some(actor);
        self.updated_at = now;
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_past(self.expiry_date, now)
    }

    pub fn is_low(&self) -> bool {
        self.min_threshold > Decimal::ZERO && self.current_stock <= self.min_threshold
    }
}

/// Input for `createItem`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockItem {
    pub name: String,
    #[serde(default)]
    pub category: IngredientCategory,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub storage_condition: StorageCondition,
    pub supplier: Option<String>,
    #[serde(default)]
    pub initial_quantity: Decimal,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub min_threshold: Decimal,
    pub max_threshold: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    /// Used to derive an expiry from the category when none is given
    pub freshness: Option<Freshness>,
    pub notes: Option<String>,
}

impl NewStockItem {
    pub fn validate(&self) -> DomainResult<()> {
        validate_item_name(&self.name)?;
        validate_non_negative("initial_quantity", self.initial_quantity)?;
        if let Some(cost) = self.cost {
            validate_cost("cost", cost)?;
        }
        validate_thresholds(self.min_threshold, self.max_threshold)
    }

    /// Explicit expiry, else the category default for the given freshness
    /// (the category's default shelf life when freshness is absent)
    pub fn resolved_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expiry_date
            .or_else(|| default_expiry(self.category, self.freshness, now))
    }

    /// Build the ledger row this input describes
    pub fn into_item(
        self,
        id: Uuid,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> DomainResult<StockItem> {
        self.validate()?;
        let expiry_date = self.resolved_expiry(now);
        let status = compute_status(self.initial_quantity, self.min_threshold, expiry_date, now);
        Ok(StockItem {
            id,
            name: self.name.trim().to_string(),
            category: self.category,
            unit: self.unit,
            storage_condition: self.storage_condition,
            supplier: self.supplier,
            initial_quantity: self.initial_quantity,
            current_stock: self.initial_quantity,
            cost: self.cost,
            min_threshold: self.min_threshold,
            max_threshold: self.max_threshold,
            expiry_date,
            status,
            notes: self.notes,
            created_by: actor,
            last_updated_by: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Audit entry appended by every ledger mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub stock_item_id: Uuid,
    pub change: Decimal,
    pub reason: MovementReason,
    pub actor: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    InitialStock,
    BatchAdded,
    Deducted,
    ManualAdjustment,
    ExpiredToWaste,
    BatchExpiredToWaste,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::InitialStock => "initial_stock",
            MovementReason::BatchAdded => "batch_added",
            MovementReason::Deducted => "deducted",
            MovementReason::ManualAdjustment => "manual_adjustment",
            MovementReason::ExpiredToWaste => "expired_to_waste",
            MovementReason::BatchExpiredToWaste => "batch_expired_to_waste",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initial_stock" => Some(MovementReason::InitialStock),
            "batch_added" => Some(MovementReason::BatchAdded),
            "deducted" => Some(MovementReason::Deducted),
            "manual_adjustment" => Some(MovementReason::ManualAdjustment),
            "expired_to_waste" => Some(MovementReason::ExpiredToWaste),
            "batch_expired_to_waste" => Some(MovementReason::BatchExpiredToWaste),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tomatoes(now: DateTime<Utc>) -> StockItem {
        NewStockItem {
            name: "Tomatoes".to_string(),
            category: IngredientCategory::Vegetables,
            unit: Unit::Kg,
            storage_condition: StorageCondition::Fridge,
            supplier: None,
            initial_quantity: dec("10"),
            cost: Some(dec("2.5")),
            min_threshold: dec("5"),
            max_threshold: None,
            expiry_date: None,
            freshness: None,
            notes: None,
        }
        .into_item(Uuid::new_v4(), Uuid::new_v4(), now)
        .unwrap()
    }

    #[test]
    fn test_status_zero_stock_wins_over_expiry() {
        let now = Utc::now();
        let status = compute_status(Decimal::ZERO, dec("5"), Some(now - Duration::days(1)), now);
        assert_eq!(status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_status_expired_wins_over_low() {
        let now = Utc::now();
        let status = compute_status(dec("1"), dec("5"), Some(now - Duration::hours(1)), now);
        assert_eq!(status, StockStatus::Expired);
    }

    #[test]
    fn test_status_low_requires_positive_threshold() {
        let now = Utc::now();
        assert_eq!(compute_status(dec("5"), dec("5"), None, now), StockStatus::LowStock);
        assert_eq!(compute_status(dec("1"), Decimal::ZERO, None, now), StockStatus::Active);
        assert_eq!(compute_status(dec("5.1"), dec("5"), None, now), StockStatus::Active);
    }

    #[test]
    fn test_future_expiry_is_not_expired() {
        let now = Utc::now();
        let status = compute_status(dec("10"), Decimal::ZERO, Some(now + Duration::days(2)), now);
        assert_eq!(status, StockStatus::Active);
    }

    #[test]
    fn test_tomatoes_deduction_scenario() {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        let mut item = tomatoes(now);
        assert_eq!(item.status, StockStatus::Active);

        item.adjust(dec("-7"), actor, now).unwrap();
        assert_eq!(item.current_stock, dec("3"));
        assert_eq!(item.status, StockStatus::LowStock);

        item.adjust(dec("-3"), actor, now).unwrap();
        assert_eq!(item.current_stock, Decimal::ZERO);
        assert_eq!(item.status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_over_deduction_leaves_stock_untouched() {
        let now = Utc::now();
        let mut item = tomatoes(now);
        item.adjust(dec("-5"), Uuid::new_v4(), now).unwrap();

        let err = item.adjust(dec("-6"), Uuid::new_v4(), now).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                item: "Tomatoes".to_string(),
                requested: dec("6"),
                available: dec("5"),
            }
        );
        assert_eq!(item.current_stock, dec("5"));
    }

    #[test]
    fn test_discontinued_is_sticky() {
        let now = Utc::now();
        let mut item = tomatoes(now);
        item.status = StockStatus::Discontinued;
        item.adjust(dec("-9"), Uuid::new_v4(), now).unwrap();
        assert_eq!(item.status, StockStatus::Discontinued);
    }

    #[test]
    fn test_negative_initial_quantity_rejected() {
        let now = Utc::now();
        let mut input = NewStockItem {
            name: "Milk".to_string(),
            category: IngredientCategory::Dairy,
            unit: Unit::Ltr,
            storage_condition: StorageCondition::Fridge,
            supplier: None,
            initial_quantity: dec("-1"),
            cost: None,
            min_threshold: Decimal::ZERO,
            max_threshold: None,
            expiry_date: None,
            freshness: None,
            notes: None,
        };
        assert!(matches!(
            input.clone().into_item(Uuid::new_v4(), Uuid::new_v4(), now),
            Err(DomainError::Validation { .. })
        ));

        input.initial_quantity = Decimal::ZERO;
        input.cost = Some(dec("-0.01"));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_freshness_derives_expiry() {
        let now = Utc::now();
        let input = NewStockItem {
            name: "Lettuce".to_string(),
            category: IngredientCategory::Vegetables,
            unit: Unit::Pcs,
            storage_condition: StorageCondition::Fridge,
            supplier: None,
            initial_quantity: dec("12"),
            cost: None,
            min_threshold: Decimal::ZERO,
            max_threshold: None,
            expiry_date: None,
            freshness: Some(Freshness::Fair),
            notes: None,
        };
        assert_eq!(input.resolved_expiry(now), Some(now + Duration::days(2)));
    }

    #[test]
    fn test_category_default_without_freshness() {
        let now = Utc::now();
        let item = tomatoes(now);
        assert_eq!(item.expiry_date, Some(now + Duration::days(4)));
        assert_eq!(item.status, StockStatus::Active);
    }

    #[test]
    fn test_zero_stock_is_out_of_stock() {
        let now = Utc::now();
        let mut item = tomatoes(now);
        item.current_stock = Decimal::ZERO;
        assert_eq!(item.derived_status(now), StockStatus::OutOfStock);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&StockStatus::LowStock).unwrap();
        assert_eq!(json, "\"low_stock\"");
        assert_eq!(StockStatus::parse("out_of_stock"), Some(StockStatus::OutOfStock));
    }
}
