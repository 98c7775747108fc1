//! Expiry processor: turns expired ledger rows and batches into waste
//!
//! Each row is written off in its own transaction. A failing row is logged
//! and skipped, so one bad row never aborts the sweep. Rows are re-read under
//! lock before writing, which makes a second or concurrent sweep find nothing
//! left to do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    run_sweep, stock_after_batch_write_off, status_after_write_off, ActorId, Batch,
    BatchDisposition, MovementReason, ProcessedWaste, StockStatus, SweepReport, SweepRun,
    SweepStore, WasteCategory, WriteOff, EXPIRED_CONFIDENCE, EXPIRED_PREDICTION_MODEL,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::batch::{BatchRow, BATCH_COLUMNS};
use crate::services::stock::{fetch_item, write_off_stock};

/// Expiry sweep service
#[derive(Clone)]
pub struct ExpiryService {
    db: PgPool,
}

/// Postgres side of one sweep: every row in its own transaction
struct PgSweepStore {
    db: PgPool,
    actor: Option<ActorId>,
}

/// Insert the waste record and the matching prediction, returning the record id
async fn record_waste(
    conn: &mut PgConnection,
    write_off: &WriteOff,
    actor: Option<ActorId>,
    now: DateTime<Utc>,
) -> AppResult<Uuid> {
    let record_id = Uuid::new_v4();
    let note = write_off.note();

    sqlx::query(
        r#"
        INSERT INTO waste_records (
            id, stock_item_id, batch_id, category, quantity, unit, cost, logged_by, logged_at, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(record_id)
    .bind(write_off.stock_item_id)
    .bind(write_off.batch_id)
    .bind(WasteCategory::Expired.as_str())
    .bind(write_off.quantity)
    .bind(write_off.unit.as_str())
    .bind(write_off.waste_cost)
    .bind(actor)
    .bind(now)
    .bind(&note)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO waste_predictions (
            id, stock_item_id, predicted_waste_quantity, prediction_date,
            prediction_model, confidence_score, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(write_off.stock_item_id)
    .bind(write_off.quantity)
    .bind(now)
    .bind(EXPIRED_PREDICTION_MODEL)
    .bind(EXPIRED_CONFIDENCE)
    .bind(&note)
    .execute(&mut *conn)
    .await?;

    Ok(record_id)
}

async fn fetch_batch_locked(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<Option<Batch>> {
    let sql = format!("SELECT {} FROM batches WHERE id = $1 FOR UPDATE", BATCH_COLUMNS);
    let row = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Batch::from))
}

async fn zero_batch(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE batches SET remaining_quantity = 0 WHERE id = $1")
        .bind(batch_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl ExpiryService {
    /// Create a new ExpiryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Sweep expired stock into waste records.
    ///
    /// Ledger rows are handled first. An expired batch whose item was already
    /// written off in this run is only zeroed, so the same physical stock is
    /// never counted twice.
    pub async fn sweep_expired(&self, actor: Option<ActorId>) -> AppResult<SweepReport> {
        let now = Utc::now();

        let expired_items = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM stock_items
            WHERE expiry_date < $1 AND current_stock > 0 AND status <> 'discontinued'
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        let expired_batches = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM batches
            WHERE expiry_date < $1 AND remaining_quantity > 0
            ORDER BY expiry_date ASC, created_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        let mut store = PgSweepStore {
            db: self.db.clone(),
            actor,
        };
        let outcome = run_sweep(&mut store, &expired_items, &expired_batches, now).await;

        for failure in &outcome.failures {
            tracing::error!(
                "Failed to write off expired {:?} {}: {}",
                failure.source,
                failure.row_id,
                failure.message
            );
        }
        tracing::info!(
            "Expiry sweep processed {} rows, waste cost {}",
            outcome.report.processed_count,
            outcome.report.total_waste_cost
        );
        Ok(outcome.report)
    }
}

#[async_trait]
impl SweepStore for PgSweepStore {
    type Error = AppError;

    async fn write_off_item(
        &mut self,
        run: &SweepRun,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ProcessedWaste>> {
        let mut tx = self.db.begin().await?;

        let mut item = fetch_item(&mut tx, item_id, true)
            .await?
            .ok_or_else(|| AppError::not_found("Stock item"))?;
        let Some(write_off) = run.item_write_off(&item, now) else {
            return Ok(None);
        };

        write_off_stock(
            &mut tx,
            &mut item,
            Decimal::ZERO,
            StockStatus::Expired,
            MovementReason::ExpiredToWaste,
            self.actor,
            now,
        )
        .await?;
        let record_id = record_waste(&mut tx, &write_off, self.actor, now).await?;

        tx.commit().await?;

        tracing::debug!(
            "Wrote off {} {} of {} (cost {})",
            write_off.quantity,
            write_off.unit,
            write_off.name,
            write_off.waste_cost
        );
        Ok(Some(ProcessedWaste::new(write_off, record_id)))
    }

    async fn write_off_batch(
        &mut self,
        run: &SweepRun,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ProcessedWaste>> {
        let mut tx = self.db.begin().await?;

        let Some(batch) = fetch_batch_locked(&mut tx, batch_id).await? else {
            return Ok(None);
        };
        let mut owner = fetch_item(&mut tx, batch.stock_item_id, true)
            .await?
            .ok_or_else(|| AppError::not_found("Stock item"))?;

        let write_off = match run.batch_disposition(&batch, &owner, now) {
            None => return Ok(None),
            Some(BatchDisposition::ZeroOnly) => {
                zero_batch(&mut tx, batch.id).await?;
                tx.commit().await?;
                tracing::debug!("Zeroed expired batch {} of an already written-off item", batch.id);
                return Ok(None);
            }
            Some(BatchDisposition::WriteOff(write_off)) => write_off,
        };

        zero_batch(&mut tx, batch.id).await?;

        let mut after = owner.clone();
        after.current_stock = stock_after_batch_write_off(owner.current_stock, write_off.quantity);
        let status = status_after_write_off(&after, now);
        write_off_stock(
            &mut tx,
            &mut owner,
            after.current_stock,
            status,
            MovementReason::BatchExpiredToWaste,
            self.actor,
            now,
        )
        .await?;
        let record_id = record_waste(&mut tx, &write_off, self.actor, now).await?;

        tx.commit().await?;

        tracing::debug!(
            "Wrote off batch {} ({} {} of {}), ledger now {}",
            batch.id,
            write_off.quantity,
            write_off.unit,
            write_off.name,
            owner.current_stock
        );
        Ok(Some(ProcessedWaste::new(write_off, record_id)))
    }
}
