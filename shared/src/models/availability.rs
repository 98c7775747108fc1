//! Recipe availability against current ledger stock
//!
//! Resolution is read-only. Expiry is judged by the real expiry date, never by
//! the stored status, since the status may lag behind the clock.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::stock::StockItem;
use crate::types::Unit;
use crate::validation::validate_non_negative;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeIngredient {
    pub stock_item_id: Uuid,
    /// Required quantity for one unit of the dish
    pub quantity: Decimal,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    LowStock,
    OutOfStock,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    NotFound,
    ExpiredNoAlternatives,
    OutOfStock,
    InsufficientQuantity,
}

impl MissingReason {
    pub fn message(&self) -> &'static str {
        match self {
            MissingReason::NotFound => "not found",
            MissingReason::ExpiredNoAlternatives => "expired, no alternatives",
            MissingReason::OutOfStock => "out of stock",
            MissingReason::InsufficientQuantity => "insufficient quantity",
        }
    }

    fn for_shortfall(resolved: &StockItem, substituted: bool, now: DateTime<Utc>) -> Self {
        if !substituted && resolved.is_expired(now) {
            MissingReason::ExpiredNoAlternatives
        } else if resolved.current_stock.is_zero() {
            MissingReason::OutOfStock
        } else {
            MissingReason::InsufficientQuantity
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingIngredient {
    pub stock_item_id: Uuid,
    pub name: Option<String>,
    pub required: Decimal,
    pub available: Decimal,
    pub unit: Unit,
    pub reason: MissingReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityResult {
    pub is_available: bool,
    pub stock_status: AvailabilityStatus,
    pub missing_ingredients: Vec<MissingIngredient>,
    /// Original stock item id to the alternate used in its place
    pub item_substitution_map: BTreeMap<Uuid, Uuid>,
}

impl AvailabilityResult {
    /// Stock item to consume for `original`, following any substitution
    pub fn resolved_id(&self, original: Uuid) -> Uuid {
        self.item_substitution_map
            .get(&original)
            .copied()
            .unwrap_or(original)
    }
}

/// Candidate alternates for `name`, best first.
///
/// Same name, not the excluded row, stock on hand, not expired. Ranked by
/// expiry ascending with undated rows first, then by stock descending.
pub fn rank_alternates<'a>(
    candidates: &'a [StockItem],
    name: &str,
    exclude_id: Uuid,
    now: DateTime<Utc>,
) -> Vec<&'a StockItem> {
    let mut ranked: Vec<&StockItem> = candidates
        .iter()
        .filter(|c| {
            c.name == name
                && c.id != exclude_id
                && c.current_stock > Decimal::ZERO
                && !c.is_expired(now)
        })
        .collect();
    ranked.sort_by(|a, b| {
        let by_expiry = match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        by_expiry.then_with(|| b.current_stock.cmp(&a.current_stock))
    });
    ranked
}

/// Best alternate, preferring one whose unit matches the recipe's unit
pub fn pick_alternate<'a>(ranked: &[&'a StockItem], unit: Unit) -> Option<&'a StockItem> {
    ranked
        .iter()
        .find(|c| c.unit == unit)
        .or_else(|| ranked.first())
        .copied()
}

/// Decide whether `ingredients` can be produced `multiplier` times.
///
/// `stock` must contain the referenced rows and any rows sharing their names.
pub fn resolve_availability(
    ingredients: &[RecipeIngredient],
    multiplier: u32,
    stock: &[StockItem],
    now: DateTime<Utc>,
) -> DomainResult<AvailabilityResult> {
    if multiplier < 1 {
        return Err(DomainError::validation("multiplier", "must be at least 1"));
    }
    for ingredient in ingredients {
        validate_non_negative("quantity", ingredient.quantity)?;
    }
    let factor = Decimal::from(multiplier);

    let mut missing = Vec::new();
    let mut substitutions = BTreeMap::new();
    let mut any_low = false;

    for ingredient in ingredients {
        let required = ingredient.quantity * factor;

        let Some(original) = stock.iter().find(|s| s.id == ingredient.stock_item_id) else {
            missing.push(MissingIngredient {
                stock_item_id: ingredient.stock_item_id,
                name: None,
                required,
                available: Decimal::ZERO,
                unit: ingredient.unit,
                reason: MissingReason::NotFound,
            });
            continue;
        };

        let usable = |item: &StockItem| !item.is_expired(now) && item.current_stock >= required;

        let mut resolved = original;
        let mut substituted = false;
        if !usable(original) {
            let ranked = rank_alternates(stock, &original.name, original.id, now);
            if let Some(alternate) = pick_alternate(&ranked, ingredient.unit) {
                substitutions.insert(original.id, alternate.id);
                resolved = alternate;
                substituted = true;
            }
        }

        if !usable(resolved) {
            missing.push(MissingIngredient {
                stock_item_id: original.id,
                name: Some(original.name.clone()),
                required,
                available: resolved.current_stock,
                unit: ingredient.unit,
                reason: MissingReason::for_shortfall(resolved, substituted, now),
            });
            continue;
        }

        if resolved.is_low() {
            any_low = true;
        }
    }

    let stock_status = if !missing.is_empty() {
        AvailabilityStatus::OutOfStock
    } else if any_low {
        AvailabilityStatus::LowStock
    } else {
        AvailabilityStatus::Available
    };

    Ok(AvailabilityResult {
        is_available: missing.is_empty(),
        stock_status,
        missing_ingredients: missing,
        item_substitution_map: substitutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stock::StockStatus;
    use crate::types::{IngredientCategory, StorageCondition};
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(name: &str, stock: &str, unit: Unit, expiry: Option<DateTime<Utc>>) -> StockItem {
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
            min_threshold: Decimal::ZERO,
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

    fn need(item: &StockItem, qty: &str) -> RecipeIngredient {
        RecipeIngredient {
            stock_item_id: item.id,
            quantity: dec(qty),
            unit: item.unit,
        }
    }

    #[test]
    fn test_rank_by_expiry_then_stock() {
        let now = Utc::now();
        let original = row("Onion", "0", Unit::Kg, None);
        let soon = row("Onion", "1", Unit::Kg, Some(now + Duration::days(1)));
        let later_small = row("Onion", "2", Unit::Kg, Some(now + Duration::days(4)));
        let undated = row("Onion", "50", Unit::Kg, None);
        let big_undated = row("Onion", "80", Unit::Kg, None);
        let expired = row("Onion", "9", Unit::Kg, Some(now - Duration::days(1)));
        let other = row("Garlic", "9", Unit::Kg, None);
        let stock = vec![
            undated.clone(),
            later_small.clone(),
            expired,
            original.clone(),
            soon.clone(),
            other,
            big_undated.clone(),
        ];

        let ranked: Vec<Uuid> = rank_alternates(&stock, "Onion", original.id, now)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ranked, vec![big_undated.id, undated.id, soon.id, later_small.id]);
    }

    #[test]
    fn test_undated_alternate_ranked_before_dated() {
        let now = Utc::now();
        let original = row("Leeks", "1", Unit::Kg, None);
        let dated = row("Leeks", "5", Unit::Kg, Some(now + Duration::days(3)));
        let undated = row("Leeks", "5", Unit::Kg, None);
        let stock = vec![original.clone(), dated.clone(), undated.clone()];

        let ranked = rank_alternates(&stock, "Leeks", original.id, now);
        assert_eq!(ranked[0].id, undated.id);
        assert_eq!(ranked[1].id, dated.id);

        let result = resolve_availability(&[need(&original, "2")], 1, &stock, now).unwrap();
        assert_eq!(result.resolved_id(original.id), undated.id);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let now = Utc::now();
        let empty = row("Salt", "0", Unit::G, None);
        let err = resolve_availability(&[need(&empty, "-2")], 1, &[empty.clone()], now).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_zero_threshold_is_never_low() {
        let now = Utc::now();
        let salt = row("Salt", "0", Unit::Kg, None);
        let result = resolve_availability(&[need(&salt, "0")], 1, &[salt.clone()], now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::Available);
    }

    #[test]
    fn test_unit_match_preferred() {
        let now = Utc::now();
        let grams = row("Flour", "900", Unit::G, Some(now + Duration::days(1)));
        let kilos = row("Flour", "3", Unit::Kg, Some(now + Duration::days(9)));
        let stock = vec![grams.clone(), kilos.clone()];
        let ranked = rank_alternates(&stock, "Flour", Uuid::new_v4(), now);

        assert_eq!(pick_alternate(&ranked, Unit::Kg).map(|s| s.id), Some(kilos.id));
        assert_eq!(pick_alternate(&ranked, Unit::Ml).map(|s| s.id), Some(grams.id));
    }

    #[test]
    fn test_substitutes_when_short() {
        let now = Utc::now();
        let short = row("Tomatoes", "1", Unit::Kg, None);
        let alternate = row("Tomatoes", "5", Unit::Kg, None);
        let stock = vec![short.clone(), alternate.clone()];

        let result = resolve_availability(&[need(&short, "2")], 1, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::Available);
        assert_eq!(result.item_substitution_map.get(&short.id), Some(&alternate.id));
        assert_eq!(result.resolved_id(short.id), alternate.id);
        assert_eq!(stock[0].current_stock, dec("1"));
    }

    #[test]
    fn test_expired_item_substituted_even_with_enough_stock() {
        let now = Utc::now();
        let mut expired = row("Milk", "10", Unit::Ltr, Some(now - Duration::hours(1)));
        expired.status = StockStatus::Active;
        let fresh = row("Milk", "2", Unit::Ltr, Some(now + Duration::days(3)));
        let stock = vec![expired.clone(), fresh.clone()];

        let result = resolve_availability(&[need(&expired, "1")], 1, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.resolved_id(expired.id), fresh.id);
    }

    #[test]
    fn test_missing_reasons() {
        let now = Utc::now();
        let expired = row("Cream", "4", Unit::Ltr, Some(now - Duration::hours(1)));
        let empty = row("Basil", "0", Unit::G, None);
        let short = row("Rice", "1", Unit::Kg, None);
        let stock = vec![expired.clone(), empty.clone(), short.clone()];
        let ghost = RecipeIngredient {
            stock_item_id: Uuid::new_v4(),
            quantity: dec("1"),
            unit: Unit::Pcs,
        };

        let result = resolve_availability(
            &[ghost, need(&expired, "1"), need(&empty, "5"), need(&short, "2")],
            1,
            &stock,
            now,
        )
        .unwrap();
        assert!(!result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::OutOfStock);
        let reasons: Vec<&str> = result
            .missing_ingredients
            .iter()
            .map(|m| m.reason.message())
            .collect();
        assert_eq!(
            reasons,
            vec!["not found", "expired, no alternatives", "out of stock", "insufficient quantity"]
        );
    }

    #[test]
    fn test_alternate_still_short() {
        let now = Utc::now();
        let short = row("Butter", "1", Unit::Kg, None);
        let alternate = row("Butter", "2", Unit::Kg, None);
        let stock = vec![short.clone(), alternate.clone()];

        let result = resolve_availability(&[need(&short, "3")], 1, &stock, now).unwrap();
        assert!(!result.is_available);
        assert_eq!(result.missing_ingredients[0].reason, MissingReason::InsufficientQuantity);
        assert_eq!(result.missing_ingredients[0].available, dec("2"));
        assert_eq!(result.item_substitution_map.get(&short.id), Some(&alternate.id));
    }

    #[test]
    fn test_low_stock_is_not_fatal() {
        let now = Utc::now();
        let mut garlic = row("Garlic", "3", Unit::Pcs, None);
        garlic.min_threshold = dec("5");
        let stock = vec![garlic.clone()];

        let result = resolve_availability(&[need(&garlic, "1")], 1, &stock, now).unwrap();
        assert!(result.is_available);
        assert_eq!(result.stock_status, AvailabilityStatus::LowStock);
    }

    #[test]
    fn test_multiplier_scales_requirement() {
        let now = Utc::now();
        let eggs = row("Eggs", "10", Unit::Pcs, None);
        let stock = vec![eggs.clone()];

        assert!(resolve_availability(&[need(&eggs, "2")], 5, &stock, now).unwrap().is_available);
        let result = resolve_availability(&[need(&eggs, "2")], 6, &stock, now).unwrap();
        assert!(!result.is_available);
        assert_eq!(result.missing_ingredients[0].required, dec("12"));
        assert!(resolve_availability(&[need(&eggs, "2")], 0, &stock, now).is_err());
    }
}
