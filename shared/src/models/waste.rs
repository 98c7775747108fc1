//! Waste records and the expiry sweep rules
//!
//! [`run_sweep`] drives one sweep over a [`SweepStore`], which persists one
//! row at a time. A row is only marked processed after its writes
//! succeeded, so a failing row is skipped without affecting the dedup of
//! later rows.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::batch::Batch;
use crate::models::stock::{StockItem, StockStatus};
use crate::types::{ActorId, Unit};

pub const EXPIRED_PREDICTION_MODEL: &str = "Expired";
pub const EXPIRED_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WasteCategory {
    Spoiled,
    OverPortioning,
    Expired,
    Burnt,
    Other,
}

impl WasteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Spoiled => "spoiled",
            WasteCategory::OverPortioning => "over-portioning",
            WasteCategory::Expired => "expired",
            WasteCategory::Burnt => "burnt",
            WasteCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spoiled" => Some(WasteCategory::Spoiled),
            "over-portioning" => Some(WasteCategory::OverPortioning),
            "expired" => Some(WasteCategory::Expired),
            "burnt" => Some(WasteCategory::Burnt),
            "other" => Some(WasteCategory::Other),
            _ => None,
        }
    }
}

/// Which kind of row a write-off came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WasteSource {
    StockItem,
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteRecord {
    pub id: Uuid,
    pub stock_item_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub category: WasteCategory,
    pub quantity: Decimal,
    pub unit: Unit,
    pub cost: Decimal,
    pub logged_by: Option<ActorId>,
    pub logged_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WastePrediction {
    pub id: Uuid,
    pub stock_item_id: Uuid,
    pub predicted_waste_quantity: Decimal,
    pub prediction_date: DateTime<Utc>,
    pub prediction_model: String,
    pub confidence_score: f64,
    pub notes: Option<String>,
}

/// Quantity to move from a ledger row or batch into waste
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOff {
    pub stock_item_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub name: String,
    pub unit: Unit,
    pub quantity: Decimal,
    pub waste_cost: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    pub source: WasteSource,
}

impl WriteOff {
    pub fn note(&self) -> String {
        match self.source {
            WasteSource::StockItem => format!("Expired stock of {} written off", self.name),
            WasteSource::Batch => format!("Expired batch of {} written off", self.name),
        }
    }
}

/// What to do with one expired batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchDisposition {
    /// Record waste and reduce the owning ledger row
    WriteOff(WriteOff),
    /// The owning row was already written off in this run: only zero the batch
    ZeroOnly,
}

/// Per-run dedup state of one sweep
#[derive(Debug, Default)]
pub struct SweepRun {
    processed: HashSet<Uuid>,
}

impl SweepRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger rows the sweep picks up
    pub fn is_expired_item(item: &StockItem, now: DateTime<Utc>) -> bool {
        item.is_expired(now)
            && item.current_stock > Decimal::ZERO
            && item.status != StockStatus::Discontinued
    }

    pub fn is_expired_batch(batch: &Batch, now: DateTime<Utc>) -> bool {
        batch.is_expired(now) && batch.has_remaining()
    }

    /// Write-off for an expired ledger row, `None` when not applicable
    pub fn item_write_off(&self, item: &StockItem, now: DateTime<Utc>) -> Option<WriteOff> {
        if self.processed.contains(&item.id) || !Self::is_expired_item(item, now) {
            return None;
        }
        let quantity = item.current_stock;
        Some(WriteOff {
            stock_item_id: item.id,
            batch_id: None,
            name: item.name.clone(),
            unit: item.unit,
            quantity,
            waste_cost: item.cost.map(|c| c * quantity).unwrap_or(Decimal::ZERO),
            expiry_date: item.expiry_date,
            source: WasteSource::StockItem,
        })
    }

    /// Disposition of an expired batch given its owning ledger row
    pub fn batch_disposition(
        &self,
        batch: &Batch,
        owner: &StockItem,
        now: DateTime<Utc>,
    ) -> Option<BatchDisposition> {
        if !Self::is_expired_batch(batch, now) {
            return None;
        }
        if self.processed.contains(&owner.id) {
            return Some(BatchDisposition::ZeroOnly);
        }
        let quantity = batch.remaining_quantity;
        let unit_cost = batch.cost_per_unit.or(owner.cost);
        Some(BatchDisposition::WriteOff(WriteOff {
            stock_item_id: owner.id,
            batch_id: Some(batch.id),
            name: owner.name.clone(),
            unit: owner.unit,
            quantity,
            waste_cost: unit_cost.map(|c| c * quantity).unwrap_or(Decimal::ZERO),
            expiry_date: batch.expiry_date,
            source: WasteSource::Batch,
        }))
    }

    pub fn mark_processed(&mut self, stock_item_id: Uuid) {
        self.processed.insert(stock_item_id);
    }
}

/// Per-row persistence behind [`run_sweep`].
///
/// Each call re-reads its row, asks `run` what to do with it and writes the
/// result atomically. `Ok(None)` means there was nothing to record.
#[async_trait]
pub trait SweepStore: Send {
    type Error: fmt::Display + Send;

    async fn write_off_item(
        &mut self,
        run: &SweepRun,
        stock_item_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ProcessedWaste>, Self::Error>;

    /// A `ZeroOnly` disposition zeroes the batch and returns `Ok(None)`
    async fn write_off_batch(
        &mut self,
        run: &SweepRun,
        batch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ProcessedWaste>, Self::Error>;
}

/// A row the sweep skipped because its write failed
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFailure {
    pub row_id: Uuid,
    pub source: WasteSource,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    pub report: SweepReport,
    pub failures: Vec<SweepFailure>,
}

/// Write off every expired ledger row, then every expired batch.
///
/// A row is marked processed only after its write succeeded, so a batch of
/// an item written off earlier in the run is zeroed without a second waste
/// record. Failed rows are collected and the sweep carries on.
pub async fn run_sweep<S: SweepStore>(
    store: &mut S,
    expired_items: &[Uuid],
    expired_batches: &[Uuid],
    now: DateTime<Utc>,
) -> SweepOutcome {
    let mut run = SweepRun::new();
    let mut outcome = SweepOutcome::default();

    for &item_id in expired_items {
        match store.write_off_item(&run, item_id, now).await {
            Ok(Some(processed)) => {
                run.mark_processed(processed.stock_item_id);
                outcome.report.push(processed);
            }
            Ok(None) => {}
            Err(e) => outcome.failures.push(SweepFailure {
                row_id: item_id,
                source: WasteSource::StockItem,
                message: e.to_string(),
            }),
        }
    }

    for &batch_id in expired_batches {
        match store.write_off_batch(&run, batch_id, now).await {
            Ok(Some(processed)) => outcome.report.push(processed),
            Ok(None) => {}
            Err(e) => outcome.failures.push(SweepFailure {
                row_id: batch_id,
                source: WasteSource::Batch,
                message: e.to_string(),
            }),
        }
    }

    outcome
}

/// Ledger quantity after writing off an expired batch, clamped at zero
pub fn stock_after_batch_write_off(current_stock: Decimal, quantity: Decimal) -> Decimal {
    (current_stock - quantity).max(Decimal::ZERO)
}

/// Status of a ledger row after a write-off has been applied to it
pub fn status_after_write_off(item: &StockItem, now: DateTime<Utc>) -> StockStatus {
    if item.current_stock.is_zero() && item.status != StockStatus::Discontinued {
        StockStatus::Expired
    } else {
        item.derived_status(now)
    }
}

/// One successfully processed row as reported by the sweep
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessedWaste {
    pub stock_item_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub waste_cost: Decimal,
    pub waste_record_id: Uuid,
    pub expiry_date: Option<DateTime<Utc>>,
    pub source: WasteSource,
}

impl ProcessedWaste {
    pub fn new(write_off: WriteOff, waste_record_id: Uuid) -> Self {
        Self {
            stock_item_id: write_off.stock_item_id,
            batch_id: write_off.batch_id,
            name: write_off.name,
            quantity: write_off.quantity,
            unit: write_off.unit,
            waste_cost: write_off.waste_cost,
            waste_record_id,
            expiry_date: write_off.expiry_date,
            source: write_off.source,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SweepReport {
    pub processed_count: usize,
    pub total_waste_cost: Decimal,
    pub processed_items: Vec<ProcessedWaste>,
}

impl SweepReport {
    pub fn push(&mut self, processed: ProcessedWaste) {
        self.processed_count += 1;
        self.total_waste_cost += processed.waste_cost;
        self.processed_items.push(processed);
    }
}
