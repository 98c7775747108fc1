//! Waste record queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{DateRange, Unit, WasteCategory, WasteRecord};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Waste record service
#[derive(Clone)]
pub struct WasteService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct WasteRecordRow {
    id: Uuid,
    stock_item_id: Uuid,
    batch_id: Option<Uuid>,
    category: String,
    quantity: Decimal,
    unit: String,
    cost: Decimal,
    logged_by: Option<Uuid>,
    logged_at: DateTime<Utc>,
    notes: Option<String>,
}

impl TryFrom<WasteRecordRow> for WasteRecord {
    type Error = AppError;

    fn try_from(row: WasteRecordRow) -> Result<Self, Self::Error> {
        let category = WasteCategory::parse(&row.category).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown waste category '{}'", row.category))
        })?;
        let unit = Unit::parse(&row.unit).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("unknown unit '{}'", row.unit))
        })?;

        Ok(WasteRecord {
            id: row.id,
            stock_item_id: row.stock_item_id,
            batch_id: row.batch_id,
            category,
            quantity: row.quantity,
            unit,
            cost: row.cost,
            logged_by: row.logged_by,
            logged_at: row.logged_at,
            notes: row.notes,
        })
    }
}

impl WasteService {
    /// Create a new WasteService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Waste records, newest first, optionally limited to a date range
    pub async fn list_waste(&self, range: Option<DateRange>) -> AppResult<Vec<WasteRecord>> {
        if let Some(range) = &range {
            if range.end < range.start {
                return Err(AppError::validation("end", "must not be before start"));
            }
        }

        let rows = sqlx::query_as::<_, WasteRecordRow>(
            r#"
            SELECT id, stock_item_id, batch_id, category, quantity, unit, cost,
                   logged_by, logged_at, notes
            FROM waste_records
            WHERE ($1::date IS NULL OR logged_at::date >= $1)
              AND ($2::date IS NULL OR logged_at::date <= $2)
            ORDER BY logged_at DESC
            "#,
        )
        .bind(range.as_ref().map(|r| r.start))
        .bind(range.as_ref().map(|r| r.end))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(WasteRecord::try_from).collect()
    }
}
