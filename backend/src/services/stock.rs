//! Stock ledger service: the only writer of `current_stock`

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    apply_delta, requires_manual_expiry, validate_scale, ActorId, DomainError,
    IngredientCategory, MovementReason, NewStockItem, StockItem, StockMovement, StockStatus,
    StorageCondition, Unit, QUANTITY_SCALE,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub(crate) const ITEM_COLUMNS: &str = "id, name, category, unit, storage_condition, supplier, \
     initial_quantity, current_stock, cost, min_threshold, max_threshold, expiry_date, status, \
     notes, created_by, last_updated_by, created_at, updated_at";

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Row for stock item queries
#[derive(Debug, FromRow)]
pub(crate) struct StockItemRow {
    id: Uuid,
    name: String,
    category: String,
    unit: String,
    storage_condition: String,
    supplier: Option<String>,
    initial_quantity: Decimal,
    current_stock: Decimal,
    cost: Option<Decimal>,
    min_threshold: Decimal,
    max_threshold: Option<Decimal>,
    expiry_date: Option<DateTime<Utc>>,
    status: String,
    notes: Option<String>,
    created_by: Uuid,
    last_updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn unknown(kind: &str, value: &str) -> AppError {
    AppError::InternalError(anyhow::anyhow!("unknown {} '{}' in stock_items", kind, value))
}

impl TryFrom<StockItemRow> for StockItem {
    type Error = AppError;

    fn try_from(row: StockItemRow) -> Result<Self, Self::Error> {
        Ok(StockItem {
            category: IngredientCategory::parse(&row.category)
                .ok_or_else(|| unknown("category", &row.category))?,
            unit: Unit::parse(&row.unit).ok_or_else(|| unknown("unit", &row.unit))?,
            storage_condition: StorageCondition::parse(&row.storage_condition)
                .ok_or_else(|| unknown("storage condition", &row.storage_condition))?,
            status: StockStatus::parse(&row.status).ok_or_else(|| unknown("status", &row.status))?,
            id: row.id,
            name: row.name,
            supplier: row.supplier,
            initial_quantity: row.initial_quantity,
            current_stock: row.current_stock,
            cost: row.cost,
            min_threshold: row.min_threshold,
            max_threshold: row.max_threshold,
            expiry_date: row.expiry_date,
            notes: row.notes,
            created_by: row.created_by,
            last_updated_by: row.last_updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    stock_item_id: Uuid,
    change: Decimal,
    reason: String,
    actor: Option<Uuid>,
    created_at: DateTime<Utc>,
}

/// Filter for listing stock items
#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub status: Option<StockStatus>,
    /// Case-insensitive substring match
    pub name: Option<String>,
}

/// Load a ledger row inside an open connection or transaction
pub(crate) async fn fetch_item(
    conn: &mut PgConnection,
    item_id: Uuid,
    lock: bool,
) -> AppResult<Option<StockItem>> {
    let sql = format!(
        "SELECT {} FROM stock_items WHERE id = $1{}",
        ITEM_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, StockItemRow>(&sql)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(StockItem::try_from)
        .transpose()
}

/// Append an audit entry for a ledger change
async fn record_movement(
    conn: &mut PgConnection,
    stock_item_id: Uuid,
    change: Decimal,
    reason: MovementReason,
    actor: Option<ActorId>,
    at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (id, stock_item_id, change, reason, actor, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(stock_item_id)
    .bind(change)
    .bind(reason.as_str())
    .bind(actor)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Persist a recomputed status when it differs from the stored one
pub(crate) async fn store_status(
    conn: &mut PgConnection,
    item: &mut StockItem,
    status: StockStatus,
) -> AppResult<()> {
    if item.status == status {
        return Ok(());
    }
    sqlx::query("UPDATE stock_items SET status = $2 WHERE id = $1")
        .bind(item.id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;
    item.status = status;
    Ok(())
}

/// Atomic `current_stock += delta` followed by a status recompute.
///
/// The increment is a single conditional UPDATE so concurrent deductions
/// cannot drive the quantity below zero.
pub(crate) async fn apply_adjustment(
    conn: &mut PgConnection,
    item_id: Uuid,
    delta: Decimal,
    reason: MovementReason,
    actor: Option<ActorId>,
    now: DateTime<Utc>,
) -> AppResult<StockItem> {
    validate_scale("delta", delta, QUANTITY_SCALE)?;

    let sql = format!(
        r#"
        UPDATE stock_items
        SET current_stock = current_stock + $2, last_updated_by = $3, updated_at = $4
        WHERE id = $1 AND current_stock + $2 >= 0
        RETURNING {}
        "#,
        ITEM_COLUMNS
    );
    let updated = sqlx::query_as::<_, StockItemRow>(&sql)
        .bind(item_id)
        .bind(delta)
        .bind(actor)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

    let mut item = match updated {
        Some(row) => StockItem::try_from(row)?,
        None => {
            // Either the row is missing or the delta would go negative
            let current = fetch_item(conn, item_id, false)
                .await?
                .ok_or_else(|| AppError::not_found("Stock item"))?;
            apply_delta(&current.name, current.current_stock, delta)?;
            return Err(
                DomainError::conflict("Stock changed concurrently, retry the adjustment").into(),
            );
        }
    };

    let status = item.derived_status(now);
    store_status(conn, &mut item, status).await?;
    record_movement(conn, item.id, delta, reason, actor, now).await?;

    Ok(item)
}

/// Set a row's stock as part of an expiry write-off.
///
/// Callers clamp `new_stock` at zero and choose the status. The difference
/// to the previous stock is recorded as a movement with `reason`.
pub(crate) async fn write_off_stock(
    conn: &mut PgConnection,
    item: &mut StockItem,
    new_stock: Decimal,
    status: StockStatus,
    reason: MovementReason,
    actor: Option<ActorId>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if new_stock < Decimal::ZERO {
        return Err(DomainError::validation("current_stock", "cannot be negative").into());
    }

    sqlx::query(
        r#"
        UPDATE stock_items
        SET current_stock = $2, status = $3, last_updated_by = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(item.id)
    .bind(new_stock)
    .bind(status.as_str())
    .bind(actor)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let change = new_stock - item.current_stock;
    if !change.is_zero() {
        record_movement(conn, item.id, change, reason, actor, now).await?;
    }

    item.current_stock = new_stock;
    item.status = status;
    item.last_updated_by = actor;
    item.updated_at = now;
    Ok(())
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a ledger row with `current_stock = initial_quantity`
    pub async fn create_item(&self, input: NewStockItem, actor: ActorId) -> AppResult<StockItem> {
        let now = Utc::now();
        if input.expiry_date.is_none() && requires_manual_expiry(input.category) {
            tracing::warn!(
                "Stock item {} ({}) created without an expiry date",
                input.name.trim(),
                input.category.as_str()
            );
        }
        let item = input.into_item(Uuid::new_v4(), actor, now)?;

        let mut tx = self.db.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO stock_items (
                id, name, category, unit, storage_condition, supplier, initial_quantity,
                current_stock, cost, min_threshold, max_threshold, expiry_date, status, notes,
                created_by, last_updated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, StockItemRow>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(item.category.as_str())
            .bind(item.unit.as_str())
            .bind(item.storage_condition.as_str())
            .bind(&item.supplier)
            .bind(item.initial_quantity)
            .bind(item.current_stock)
            .bind(item.cost)
            .bind(item.min_threshold)
            .bind(item.max_threshold)
            .bind(item.expiry_date)
            .bind(item.status.as_str())
            .bind(&item.notes)
            .bind(item.created_by)
            .bind(item.last_updated_by)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        if !item.initial_quantity.is_zero() {
            record_movement(
                &mut tx,
                item.id,
                item.initial_quantity,
                MovementReason::InitialStock,
                Some(actor),
                now,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Created stock item {} ({})", item.name, item.id);
        StockItem::try_from(row)
    }

    pub async fn get_item(&self, item_id: Uuid) -> AppResult<StockItem> {
        let mut conn = self.db.acquire().await?;
        fetch_item(&mut conn, item_id, false)
            .await?
            .ok_or_else(|| AppError::not_found("Stock item"))
    }

    pub async fn list_items(&self, filter: ItemFilter) -> AppResult<Vec<StockItem>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM stock_items
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY name ASC, created_at ASC
            "#,
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, StockItemRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.name.as_deref().map(str::trim))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(StockItem::try_from).collect()
    }

    /// Apply a signed adjustment. Fails with `InsufficientStock` when the
    /// result would be negative; nothing is changed in that case.
    pub async fn adjust_stock(
        &self,
        item_id: Uuid,
        delta: Decimal,
        reason: MovementReason,
        actor: ActorId,
    ) -> AppResult<StockItem> {
        let mut tx = self.db.begin().await?;
        let item =
            apply_adjustment(&mut tx, item_id, delta, reason, Some(actor), Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!(
            "Adjusted {} by {} ({}), now {} [{}]",
            item.name,
            delta,
            reason.as_str(),
            item.current_stock,
            item.status
        );
        Ok(item)
    }

    /// Mark an item discontinued or bring it back into the status rule
    pub async fn set_discontinued(
        &self,
        item_id: Uuid,
        discontinued: bool,
        actor: ActorId,
    ) -> AppResult<StockItem> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut item = fetch_item(&mut tx, item_id, true)
            .await?
            .ok_or_else(|| AppError::not_found("Stock item"))?;

        let status = if discontinued {
            StockStatus::Discontinued
        } else {
            shared::compute_status(item.current_stock, item.min_threshold, item.expiry_date, now)
        };

        sqlx::query(
            "UPDATE stock_items SET status = $2, last_updated_by = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(item.id)
        .bind(status.as_str())
        .bind(actor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        item.status = status;
        item.last_updated_by = Some(actor);
        item.updated_at = now;
        tracing::info!("Stock item {} status set to {}", item.id, status);
        Ok(item)
    }

    /// Status-only housekeeping: rows whose ledger expiry has passed become
    /// `expired` without moving any stock.
    pub async fn refresh_expired_statuses(&self) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE stock_items
            SET status = 'expired', updated_at = $1
            WHERE expiry_date < $1
              AND current_stock > 0
              AND status NOT IN ('expired', 'discontinued')
            "#,
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let touched = result.rows_affected();
        if touched > 0 {
            tracing::info!("Marked {} stock items as expired", touched);
        }
        Ok(touched)
    }

    /// Audit trail of one item, newest first
    pub async fn list_movements(&self, item_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_items WHERE id = $1)",
        )
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::not_found("Stock item"));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, stock_item_id, change, reason, actor, created_at
            FROM stock_movements
            WHERE stock_item_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let reason = MovementReason::parse(&row.reason).ok_or_else(|| {
                    let message = format!("unknown movement reason '{}'", row.reason);
                    AppError::InternalError(anyhow::anyhow!(message))
                })?;
                Ok(StockMovement {
                    id: row.id,
                    stock_item_id: row.stock_item_id,
                    change: row.change,
                    reason,
                    actor: row.actor,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
