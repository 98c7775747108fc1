//! Daily batch tracker models
//!
//! Batches are bookkeeping for FIFO consumption. Their remaining quantities
//! are advisory: they are not reconciled against the ledger's current stock
//! and the two may drift apart.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainResult;
use crate::models::stock::is_past;
use crate::types::ActorId;
use crate::validation::{validate_cost, validate_positive};

/// A dated quantity of one ingredient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: Uuid,
    pub stock_item_id: Uuid,
    /// Operating day the batch is filed under
    pub operating_date: NaiveDate,
    pub quantity_added: Decimal,
    /// Decremented by FIFO consumption, `0 <= remaining <= added`
    pub remaining_quantity: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    /// Set when the batch was created by carrying another batch forward
    pub carried_from: Option<Uuid>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_past(self.expiry_date, now)
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }
}

/// Input for `logBatch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub stock_item_id: Uuid,
    pub quantity: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl NewBatch {
    pub fn validate(&self) -> DomainResult<()> {
        validate_positive("quantity", self.quantity)?;
        if let Some(cost) = self.cost_per_unit {
            validate_cost("cost_per_unit", cost)?;
        }
        Ok(())
    }

    pub fn into_batch(
        self,
        id: Uuid,
        operating_date: NaiveDate,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> DomainResult<Batch> {
        self.validate()?;
        Ok(Batch {
            id,
            stock_item_id: self.stock_item_id,
            operating_date,
            quantity_added: self.quantity,
            remaining_quantity: self.quantity,
            cost_per_unit: self.cost_per_unit,
            expiry_date: self.expiry_date,
            carried_from: None,
            created_by: actor,
            created_at: now,
        })
    }
}

/// FIFO order: earliest expiry first, batches without expiry last, then
/// creation order.
pub fn fifo_order(a: &Batch, b: &Batch) -> Ordering {
    let by_expiry = match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry.then_with(|| a.created_at.cmp(&b.created_at))
}

/// Decrement applied to one batch
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FifoAllocation {
    pub batch_id: Uuid,
    pub quantity: Decimal,
    pub remaining_after: Decimal,
}

/// Result of a best-effort FIFO walk.
///
/// `tracked` may be less than `requested`. That is not an error: the ledger
/// deduction has already happened and the shortfall is simply untracked.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FifoOutcome {
    pub requested: Decimal,
    pub tracked: Decimal,
    pub allocations: Vec<FifoAllocation>,
}

impl FifoOutcome {
    pub fn untracked(&self) -> Decimal {
        self.requested - self.tracked
    }

    pub fn is_complete(&self) -> bool {
        self.tracked >= self.requested
    }
}

/// Plan the FIFO walk for `quantity` of `stock_item_id` on `day`.
///
/// Only that day's batches with a remainder are eligible, and expired batches
/// are skipped (they are left for the expiry sweep).
pub fn plan_fifo_consumption(
    batches: &[Batch],
    stock_item_id: Uuid,
    day: NaiveDate,
    quantity: Decimal,
    now: DateTime<Utc>,
) -> FifoOutcome {
    let mut eligible: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.stock_item_id == stock_item_id && b.operating_date == day && b.has_remaining())
        .collect();
    eligible.sort_by(|a, b| fifo_order(a, b));

    let mut still_needed = quantity;
    let mut allocations = Vec::new();
    for batch in eligible {
        if still_needed <= Decimal::ZERO {
            break;
        }
        if batch.is_expired(now) {
            continue;
        }
        let take = batch.remaining_quantity.min(still_needed);
        still_needed -= take;
        allocations.push(FifoAllocation {
            batch_id: batch.id,
            quantity: take,
            remaining_after: batch.remaining_quantity - take,
        });
    }

    FifoOutcome {
        requested: quantity,
        tracked: quantity - still_needed.max(Decimal::ZERO),
        allocations,
    }
}
