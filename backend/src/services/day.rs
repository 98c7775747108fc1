//! Day lifecycle service: end of day, start of day and carry-forward

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shared::{
    check_can_start, check_carry_stamped, plan_carry_forward, plan_previous_day_import,
    previous_day, ActorId, Batch, DayState, DayStatus, DomainError, ImportAction, SkippedBatch,
    ALREADY_CARRIED,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::batch::{fetch_day_batches, insert_batch};

/// Day lifecycle service
#[derive(Clone)]
pub struct DayService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DayStatusRow {
    is_ended: bool,
    ended_at: Option<DateTime<Utc>>,
    ended_by: Option<Uuid>,
}

impl DayStatusRow {
    fn into_state(self) -> DayState {
        match (self.is_ended, self.ended_at) {
            (true, Some(ended_at)) => DayState::Ended {
                ended_at,
                ended_by: self.ended_by,
            },
            _ => DayState::Active,
        }
    }
}

/// Result of `startNewDay`
#[derive(Debug, Clone, Serialize)]
pub struct StartedDay {
    pub day: DayStatus,
    pub carried: Vec<Batch>,
    pub dropped_expired: Vec<Uuid>,
}

/// Result of `importPreviousDayRemaining`
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub merged: usize,
    pub skipped: Vec<SkippedBatch>,
}

/// State of `day`; no stored record means the day is active
pub(crate) async fn fetch_day_state(
    conn: &mut PgConnection,
    day: NaiveDate,
) -> AppResult<DayState> {
    let row = sqlx::query_as::<_, DayStatusRow>(
        "SELECT is_ended, ended_at, ended_by FROM day_statuses WHERE operating_date = $1",
    )
    .bind(day)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(DayStatusRow::into_state).unwrap_or_default())
}

/// Whether yesterday's batches were already carried into `today`
async fn already_carried(conn: &mut PgConnection, today: NaiveDate) -> AppResult<bool> {
    let carried = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM batches WHERE operating_date = $1 AND carried_over_at IS NOT NULL)",
    )
    .bind(previous_day(today))
    .fetch_one(&mut *conn)
    .await?;

    Ok(carried)
}

/// Stamp the source batches of a carry-forward.
///
/// Only unstamped rows are touched. When a concurrent carry-forward stamped
/// any of them first, this one fails with a conflict and rolls back.
async fn mark_carried(
    conn: &mut PgConnection,
    sources: &[Uuid],
    at: DateTime<Utc>,
) -> AppResult<()> {
    if sources.is_empty() {
        return Ok(());
    }
    let result = sqlx::query(
        "UPDATE batches SET carried_over_at = $2 WHERE id = ANY($1) AND carried_over_at IS NULL",
    )
    .bind(sources)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    check_carry_stamped(sources.len(), result.rows_affected())?;
    Ok(())
}

impl DayService {
    /// Create a new DayService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_day_status(&self, day: NaiveDate) -> AppResult<DayStatus> {
        let mut conn = self.db.acquire().await?;
        let state = fetch_day_state(&mut conn, day).await?;
        Ok(DayStatus::new(day, state))
    }

    /// Active -> Ended.
    ///
    /// The upsert only fires while the stored row is still active, so two
    /// concurrent calls cannot both succeed.
    pub async fn end_day(&self, day: NaiveDate, actor: ActorId) -> AppResult<DayStatus> {
        let now = Utc::now();
        let mut conn = self.db.acquire().await?;

        let current = fetch_day_state(&mut conn, day).await?;
        let ended = current.end(now, Some(actor))?;

        let row = sqlx::query_as::<_, DayStatusRow>(
            r#"
            INSERT INTO day_statuses (operating_date, is_ended, ended_at, ended_by)
            VALUES ($1, TRUE, $2, $3)
            ON CONFLICT (operating_date) DO UPDATE
            SET is_ended = TRUE, ended_at = EXCLUDED.ended_at, ended_by = EXCLUDED.ended_by
            WHERE day_statuses.is_ended = FALSE
            RETURNING is_ended, ended_at, ended_by
            "#,
        )
        .bind(day)
        .bind(now)
        .bind(actor)
        .fetch_optional(&mut *conn)
        .await?;

        if row.is_none() {
            return Err(DomainError::conflict("The day has already been ended").into());
        }

        tracing::info!("Day {} ended by {}", day, actor);
        Ok(DayStatus::new(day, ended))
    }

    /// Re-date yesterday's unconsumed, unexpired batches into `today`.
    /// The ledger is not touched.
    pub async fn start_new_day(&self, today: NaiveDate, actor: ActorId) -> AppResult<StartedDay> {
        let now = Utc::now();
        let yesterday = previous_day(today);
        let mut tx = self.db.begin().await?;

        let yesterday_state = fetch_day_state(&mut tx, yesterday).await?;
        let today_state = fetch_day_state(&mut tx, today).await?;
        check_can_start(yesterday_state, today_state)?;

        if already_carried(&mut tx, today).await? {
            return Err(DomainError::conflict(ALREADY_CARRIED).into());
        }

        let yesterday_batches = fetch_day_batches(&mut tx, yesterday).await?;
        let plan = plan_carry_forward(&yesterday_batches, now);

        let sources: Vec<Uuid> = plan.carried.iter().map(|c| c.source_batch_id).collect();
        mark_carried(&mut tx, &sources, now).await?;

        let mut carried = Vec::with_capacity(plan.carried.len());
        for carry in plan.carried {
            let batch = carry.into_batch(Uuid::new_v4(), today, actor, now);
            carried.push(insert_batch(&mut tx, &batch).await?);
        }

        tx.commit().await?;

        tracing::info!(
            "Started day {}: {} batches carried forward, {} expired left behind",
            today,
            carried.len(),
            plan.dropped_expired.len()
        );

        Ok(StartedDay {
            day: DayStatus::new(today, today_state),
            carried,
            dropped_expired: plan.dropped_expired,
        })
    }

    /// Preview of yesterday's batches that could still be carried into `today`
    pub async fn previous_day_remaining(&self, today: NaiveDate) -> AppResult<Vec<Batch>> {
        let now = Utc::now();
        let mut conn = self.db.acquire().await?;
        let batches = fetch_day_batches(&mut conn, previous_day(today)).await?;

        Ok(batches
            .into_iter()
            .filter(|b| b.has_remaining() && !b.is_expired(now))
            .collect())
    }

    /// Manual carry-forward: merge yesterday's remainders into matching
    /// batches of `today` or create new ones.
    pub async fn import_previous_day_remaining(
        &self,
        today: NaiveDate,
        actor: ActorId,
    ) -> AppResult<ImportSummary> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        fetch_day_state(&mut tx, today).await?.ensure_open()?;
        if already_carried(&mut tx, today).await? {
            return Err(DomainError::conflict(ALREADY_CARRIED).into());
        }

        let yesterday_batches = fetch_day_batches(&mut tx, previous_day(today)).await?;
        if yesterday_batches.is_empty() {
            return Err(AppError::not_found("Batches for the previous day"));
        }
        let today_batches = fetch_day_batches(&mut tx, today).await?;

        let plan = plan_previous_day_import(&yesterday_batches, &today_batches, now);
        let sources: Vec<Uuid> = yesterday_batches
            .iter()
            .filter(|b| b.has_remaining() && !b.is_expired(now))
            .map(|b| b.id)
            .collect();
        mark_carried(&mut tx, &sources, now).await?;
        let (merged, added) = (plan.merged_count(), plan.created_count());

        for action in plan.actions {
            match action {
                ImportAction::Merge {
                    target_batch_id,
                    quantity,
                    ..
                } => {
                    sqlx::query(
                        r#"
                        UPDATE batches
                        SET quantity_added = quantity_added + $2,
                            remaining_quantity = remaining_quantity + $2
                        WHERE id = $1
                        "#,
                    )
                    .bind(target_batch_id)
                    .bind(quantity)
                    .execute(&mut *tx)
                    .await?;
                }
                ImportAction::Create(carry) => {
                    let batch = carry.into_batch(Uuid::new_v4(), today, actor, now);
                    insert_batch(&mut tx, &batch).await?;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Imported previous-day stock into {}: {} added, {} merged, {} skipped",
            today,
            added,
            merged,
            plan.skipped.len()
        );

        Ok(ImportSummary {
            added,
            merged,
            skipped: plan.skipped,
        })
    }
}
