//! Daily batch tracker service
//!
//! Batches are FIFO bookkeeping only. The ledger is always written first and
//! the batch log second; the two writes are separate and may drift.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    plan_fifo_consumption, validate_positive, ActorId, Batch, FifoOutcome, MovementReason,
    NewBatch, NewStockItem, StockItem,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::day::fetch_day_state;
use crate::services::stock::{apply_adjustment, StockService};

pub(crate) const BATCH_COLUMNS: &str = "id, stock_item_id, operating_date, quantity_added, \
     remaining_quantity, cost_per_unit, expiry_date, carried_from, created_by, created_at";

/// Batch tracker service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

/// Row for batch queries
#[derive(Debug, FromRow)]
pub(crate) struct BatchRow {
    id: Uuid,
    stock_item_id: Uuid,
    operating_date: NaiveDate,
    quantity_added: Decimal,
    remaining_quantity: Decimal,
    cost_per_unit: Option<Decimal>,
    expiry_date: Option<DateTime<Utc>>,
    carried_from: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            stock_item_id: row.stock_item_id,
            operating_date: row.operating_date,
            quantity_added: row.quantity_added,
            remaining_quantity: row.remaining_quantity,
            cost_per_unit: row.cost_per_unit,
            expiry_date: row.expiry_date,
            carried_from: row.carried_from,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// What a batch is being added to
#[derive(Debug, Clone)]
pub enum BatchTarget {
    Existing(Uuid),
    /// Create the ledger row first, with no stock of its own
    New(NewStockItem),
}

/// Result of `addBatch`
#[derive(Debug, Clone, Serialize)]
pub struct AddedBatch {
    pub item: StockItem,
    pub batch: Batch,
}

/// Result of `deduct`
#[derive(Debug, Clone, Serialize)]
pub struct Deduction {
    pub item: StockItem,
    /// `None` when the FIFO bookkeeping itself failed
    pub tracking: Option<FifoOutcome>,
}

/// Batches of one operating day
#[derive(Debug, Clone, Serialize)]
pub struct DayBatches {
    pub date: NaiveDate,
    pub is_ended: bool,
    pub batches: Vec<Batch>,
}

pub(crate) async fn insert_batch(conn: &mut PgConnection, batch: &Batch) -> AppResult<Batch> {
    let sql = format!(
        r#"
        INSERT INTO batches (
            id, stock_item_id, operating_date, quantity_added, remaining_quantity,
            cost_per_unit, expiry_date, carried_from, created_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        BATCH_COLUMNS
    );
    let row = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(batch.id)
        .bind(batch.stock_item_id)
        .bind(batch.operating_date)
        .bind(batch.quantity_added)
        .bind(batch.remaining_quantity)
        .bind(batch.cost_per_unit)
        .bind(batch.expiry_date)
        .bind(batch.carried_from)
        .bind(batch.created_by)
        .bind(batch.created_at)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into())
}

pub(crate) async fn fetch_day_batches(
    conn: &mut PgConnection,
    day: NaiveDate,
) -> AppResult<Vec<Batch>> {
    let sql = format!(
        "SELECT {} FROM batches WHERE operating_date = $1 ORDER BY created_at DESC",
        BATCH_COLUMNS
    );
    let rows = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(day)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(Batch::from).collect())
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Log a batch on `day`: ledger `+quantity` first, then the batch row.
    pub async fn log_batch(
        &self,
        input: NewBatch,
        day: NaiveDate,
        actor: ActorId,
    ) -> AppResult<AddedBatch> {
        input.validate()?;
        let now = Utc::now();

        // One connection at a time: the gate and the ledger share the transaction
        let mut tx = self.db.begin().await?;
        fetch_day_state(&mut tx, day).await?.ensure_open()?;
        let item = apply_adjustment(
            &mut tx,
            input.stock_item_id,
            input.quantity,
            MovementReason::BatchAdded,
            Some(actor),
            now,
        )
        .await?;
        tx.commit().await?;

        let batch = input.into_batch(Uuid::new_v4(), day, actor, now)?;
        let mut conn = self.db.acquire().await?;
        let batch = match insert_batch(&mut conn, &batch).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(
                    "Ledger for {} increased by {} but the batch log write failed: {}",
                    item.id,
                    batch.quantity_added,
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            "Logged batch {} of {} {} for {} on {}",
            batch.id,
            batch.quantity_added,
            item.unit,
            item.name,
            day
        );
        Ok(AddedBatch { item, batch })
    }

    /// `addBatch`: log a batch against an existing item or a newly created one
    pub async fn add_batch(
        &self,
        target: BatchTarget,
        quantity: Decimal,
        cost_per_unit: Option<Decimal>,
        expiry_date: Option<DateTime<Utc>>,
        day: NaiveDate,
        actor: ActorId,
    ) -> AppResult<AddedBatch> {
        validate_positive("quantity", quantity)?;

        let (stock_item_id, expiry_date) = match target {
            BatchTarget::Existing(id) => (id, expiry_date),
            BatchTarget::New(mut new_item) => {
                let mut conn = self.db.acquire().await?;
                fetch_day_state(&mut conn, day).await?.ensure_open()?;
                drop(conn);

                new_item.initial_quantity = Decimal::ZERO;
                let item = StockService::new(self.db.clone())
                    .create_item(new_item, actor)
                    .await?;
                (item.id, expiry_date.or(item.expiry_date))
            }
        };

        self.log_batch(
            NewBatch {
                stock_item_id,
                quantity,
                cost_per_unit,
                expiry_date,
            },
            day,
            actor,
        )
        .await
    }

    /// Best-effort FIFO walk over `day`'s batches of one item.
    ///
    /// Coverage short of `quantity` is reported, not raised. The per-batch
    /// decrements are not atomic across the loop.
    pub async fn consume_fifo(
        &self,
        stock_item_id: Uuid,
        quantity: Decimal,
        day: NaiveDate,
    ) -> AppResult<FifoOutcome> {
        let now = Utc::now();
        let sql = format!(
            r#"
            SELECT {}
            FROM batches
            WHERE stock_item_id = $1 AND operating_date = $2 AND remaining_quantity > 0
            "#,
            BATCH_COLUMNS
        );
        let batches: Vec<Batch> = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(stock_item_id)
            .bind(day)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Batch::from)
            .collect();

        let outcome = plan_fifo_consumption(&batches, stock_item_id, day, quantity, now);

        for allocation in &outcome.allocations {
            sqlx::query(
                r#"
                UPDATE batches
                SET remaining_quantity = GREATEST(remaining_quantity - $2, 0)
                WHERE id = $1
                "#,
            )
            .bind(allocation.batch_id)
            .bind(allocation.quantity)
            .execute(&self.db)
            .await?;

            tracing::debug!(
                "FIFO took {} from batch {} ({} left)",
                allocation.quantity,
                allocation.batch_id,
                allocation.remaining_after
            );
        }

        if !outcome.is_complete() {
            tracing::warn!(
                "FIFO tracking for item {} on {} covered {} of {}; {} untracked",
                stock_item_id,
                day,
                outcome.tracked,
                outcome.requested,
                outcome.untracked()
            );
        }

        Ok(outcome)
    }

    /// `deduct`: ledger deduction, then best-effort FIFO bookkeeping.
    ///
    /// Fails with `InsufficientStock` without touching anything when the
    /// ledger cannot cover `quantity`.
    pub async fn deduct(
        &self,
        stock_item_id: Uuid,
        quantity: Decimal,
        day: NaiveDate,
        actor: ActorId,
    ) -> AppResult<Deduction> {
        validate_positive("quantity", quantity)?;

        let item = StockService::new(self.db.clone())
            .adjust_stock(stock_item_id, -quantity, MovementReason::Deducted, actor)
            .await?;

        let tracking = match self.consume_fifo(stock_item_id, quantity, day).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(
                    "FIFO bookkeeping failed for item {} after deducting {}: {}",
                    stock_item_id,
                    quantity,
                    e
                );
                None
            }
        };

        Ok(Deduction { item, tracking })
    }

    /// Batches of an operating day, newest first
    pub async fn list_batches(&self, day: NaiveDate) -> AppResult<DayBatches> {
        let mut conn = self.db.acquire().await?;
        let state = fetch_day_state(&mut conn, day).await?;
        let batches = fetch_day_batches(&mut conn, day).await?;

        Ok(DayBatches {
            date: day,
            is_ended: state.is_ended(),
            batches,
        })
    }
}
