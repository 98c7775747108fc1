//! Default shelf life by ingredient category

use chrono::{DateTime, Duration, Utc};

use crate::types::{Freshness, IngredientCategory};

/// Shelf life in days for `(fresh, good, fair, default)`.
/// `None` means the date has to be read off the packaging.
fn shelf_life_days(category: IngredientCategory) -> Option<(i64, i64, i64, i64)> {
    match category {
        IngredientCategory::Vegetables => Some((5, 3, 2, 4)),
        IngredientCategory::Fruits => Some((7, 5, 3, 5)),
        IngredientCategory::Meat => Some((2, 1, 1, 2)),
        IngredientCategory::Seafood => Some((2, 1, 1, 1)),
        IngredientCategory::Grains => Some((365, 365, 180, 365)),
        IngredientCategory::Spices => Some((1095, 730, 365, 730)),
        IngredientCategory::Beverages => Some((30, 14, 7, 14)),
        IngredientCategory::Frozen => Some((180, 90, 30, 90)),
        IngredientCategory::Canned => Some((1825, 1095, 730, 1095)),
        IngredientCategory::Dairy | IngredientCategory::Other => None,
    }
}

/// Expiry derived from category and freshness, counted from `added_on`
pub fn default_expiry(
    category: IngredientCategory,
    freshness: Option<Freshness>,
    added_on: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let (fresh, good, fair, default) = shelf_life_days(category)?;
    let days = match freshness {
        Some(Freshness::Fresh) => fresh,
        Some(Freshness::Good) => good,
        Some(Freshness::Fair) => fair,
        None => default,
    };
    Some(added_on + Duration::days(days))
}

pub fn requires_manual_expiry(category: IngredientCategory) -> bool {
    shelf_life_days(category).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vegetable_shelf_life() {
        let now = Utc::now();
        assert_eq!(
            default_expiry(IngredientCategory::Vegetables, Some(Freshness::Fresh), now),
            Some(now + Duration::days(5))
        );
        assert_eq!(
            default_expiry(IngredientCategory::Vegetables, None, now),
            Some(now + Duration::days(4))
        );
    }

    #[test]
    fn test_seafood_default_is_one_day() {
        let now = Utc::now();
        assert_eq!(
            default_expiry(IngredientCategory::Seafood, None, now),
            Some(now + Duration::days(1))
        );
    }

    #[test]
    fn test_dairy_needs_manual_date() {
        let now = Utc::now();
        assert!(requires_manual_expiry(IngredientCategory::Dairy));
        assert!(requires_manual_expiry(IngredientCategory::Other));
        assert_eq!(default_expiry(IngredientCategory::Dairy, Some(Freshness::Fresh), now), None);
        assert!(!requires_manual_expiry(IngredientCategory::Canned));
    }
}
