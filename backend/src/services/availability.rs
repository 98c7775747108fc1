//! Availability resolver service (read-only)

use chrono::Utc;
use shared::{resolve_availability, AvailabilityResult, RecipeIngredient, StockItem};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::{StockItemRow, ITEM_COLUMNS};

/// Availability service
#[derive(Clone)]
pub struct AvailabilityService {
    db: PgPool,
}

impl AvailabilityService {
    /// Create a new AvailabilityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check whether a recipe can be produced `multiplier` times.
    ///
    /// Loads the referenced rows plus every row sharing their names, which is
    /// the full candidate set for substitution. Nothing is written.
    pub async fn check_availability(
        &self,
        ingredients: &[RecipeIngredient],
        multiplier: u32,
    ) -> AppResult<AvailabilityResult> {
        let ids: Vec<Uuid> = ingredients.iter().map(|i| i.stock_item_id).collect();

        let sql = format!(
            r#"
            SELECT {}
            FROM stock_items
            WHERE id = ANY($1)
               OR name IN (SELECT name FROM stock_items WHERE id = ANY($1))
            "#,
            ITEM_COLUMNS
        );
        let stock = sqlx::query_as::<_, StockItemRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(StockItem::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let result = resolve_availability(ingredients, multiplier, &stock, Utc::now())?;

        for (original, alternate) in &result.item_substitution_map {
            tracing::debug!("Substituting stock item {} with {}", original, alternate);
        }
        if !result.is_available {
            tracing::debug!(
                "Recipe not available: {} missing ingredients",
                result.missing_ingredients.len()
            );
        }

        Ok(result)
    }
}
