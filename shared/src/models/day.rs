//! Day lifecycle: the operating-day state machine and carry-forward planning

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::batch::Batch;
use crate::types::ActorId;

/// State of one operating day. A day without a stored record is `Active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayState {
    #[default]
    Active,
    Ended {
        ended_at: DateTime<Utc>,
        ended_by: Option<ActorId>,
    },
}

impl DayState {
    pub fn is_ended(&self) -> bool {
        matches!(self, DayState::Ended { .. })
    }

    /// Active -> Ended
    pub fn end(&self, at: DateTime<Utc>, by: Option<ActorId>) -> DomainResult<DayState> {
        match self {
            DayState::Active => Ok(DayState::Ended {
                ended_at: at,
                ended_by: by,
            }),
            DayState::Ended { .. } => Err(DomainError::conflict("The day has already been ended")),
        }
    }

    /// Gate for batch additions
    pub fn ensure_open(&self) -> DomainResult<()> {
        if self.is_ended() {
            return Err(DomainError::conflict("day ended"));
        }
        Ok(())
    }
}

/// Wire shape of a day's state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub is_ended: bool,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<ActorId>,
}

impl DayStatus {
    pub fn new(date: NaiveDate, state: DayState) -> Self {
        match state {
            DayState::Active => Self {
                date,
                is_ended: false,
                ended_at: None,
                ended_by: None,
            },
            DayState::Ended { ended_at, ended_by } => Self {
                date,
                is_ended: true,
                ended_at: Some(ended_at),
                ended_by,
            },
        }
    }
}

pub fn previous_day(day: NaiveDate) -> NaiveDate {
    day - Duration::days(1)
}

/// Preconditions of `startNewDay`
pub fn check_can_start(yesterday: DayState, today: DayState) -> DomainResult<()> {
    if today.is_ended() {
        return Err(DomainError::conflict(
            "Today's day has already been ended. Cannot start a new day.",
        ));
    }
    if !yesterday.is_ended() {
        return Err(DomainError::conflict(
            "Yesterday's day must be ended before starting a new day",
        ));
    }
    Ok(())
}

pub const ALREADY_CARRIED: &str = "Yesterday's batches have already been carried into this day";

/// Every source batch of a carry-forward must be stamped by this call.
/// Fewer stamped rows mean another carry-forward got there first.
pub fn check_carry_stamped(sources: usize, stamped: u64) -> DomainResult<()> {
    if stamped != sources as u64 {
        return Err(DomainError::conflict(ALREADY_CARRIED));
    }
    Ok(())
}

/// A yesterday batch to be re-dated into today
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarryForward {
    pub source_batch_id: Uuid,
    pub stock_item_id: Uuid,
    pub quantity: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl CarryForward {
    fn from_batch(batch: &Batch) -> Self {
        Self {
            source_batch_id: batch.id,
            stock_item_id: batch.stock_item_id,
            quantity: batch.remaining_quantity,
            cost_per_unit: batch.cost_per_unit,
            expiry_date: batch.expiry_date,
        }
    }

    /// New today batch with `quantity_added == remaining_quantity`
    pub fn into_batch(
        self,
        id: Uuid,
        today: NaiveDate,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Batch {
        Batch {
            id,
            stock_item_id: self.stock_item_id,
            operating_date: today,
            quantity_added: self.quantity,
            remaining_quantity: self.quantity,
            cost_per_unit: self.cost_per_unit,
            expiry_date: self.expiry_date,
            carried_from: Some(self.source_batch_id),
            created_by: actor,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CarryForwardPlan {
    pub carried: Vec<CarryForward>,
    /// Batches left behind because their expiry has passed
    pub dropped_expired: Vec<Uuid>,
}

/// Select yesterday's batches that move into today.
/// The ledger is not touched: the stock never left it.
pub fn plan_carry_forward(yesterday_batches: &[Batch], now: DateTime<Utc>) -> CarryForwardPlan {
    let mut plan = CarryForwardPlan::default();
    for batch in yesterday_batches.iter().filter(|b| b.has_remaining()) {
        if batch.is_expired(now) {
            plan.dropped_expired.push(batch.id);
        } else {
            plan.carried.push(CarryForward::from_batch(batch));
        }
    }
    plan
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ImportAction {
    /// Add to an existing today batch of the same item and expiry
    Merge {
        target_batch_id: Uuid,
        source_batch_id: Uuid,
        quantity: Decimal,
    },
    Create(CarryForward),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedBatch {
    pub batch_id: Uuid,
    pub stock_item_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ImportPlan {
    pub actions: Vec<ImportAction>,
    pub skipped: Vec<SkippedBatch>,
}

impl ImportPlan {
    pub fn merged_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, ImportAction::Merge { .. }))
            .count()
    }

    pub fn created_count(&self) -> usize {
        self.actions.len() - self.merged_count()
    }
}

/// Plan a manual import of yesterday's remainders into today.
///
/// Several yesterday batches with the same item and expiry fold into a single
/// new batch.
pub fn plan_previous_day_import(
    yesterday: &[Batch],
    today_batches: &[Batch],
    now: DateTime<Utc>,
) -> ImportPlan {
    let mut plan = ImportPlan::default();

    for batch in yesterday.iter().filter(|b| b.has_remaining()) {
        if batch.is_expired(now) {
            plan.skipped.push(SkippedBatch {
                batch_id: batch.id,
                stock_item_id: batch.stock_item_id,
                reason: "Expired".to_string(),
            });
            continue;
        }

        let existing = today_batches
            .iter()
            .find(|t| t.stock_item_id == batch.stock_item_id && t.expiry_date == batch.expiry_date);
        if let Some(target) = existing {
            plan.actions.push(ImportAction::Merge {
                target_batch_id: target.id,
                source_batch_id: batch.id,
                quantity: batch.remaining_quantity,
            });
            continue;
        }

        let pending = plan.actions.iter_mut().find_map(|action| match action {
            ImportAction::Create(carry)
                if carry.stock_item_id == batch.stock_item_id
                    && carry.expiry_date == batch.expiry_date =>
            {
                Some(carry)
            }
            _ => None,
        });
        match pending {
            Some(carry) => carry.quantity += batch.remaining_quantity,
            None => plan.actions.push(ImportAction::Create(CarryForward::from_batch(batch))),
        }
    }

    plan
}
