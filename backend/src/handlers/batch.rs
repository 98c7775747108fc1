//! HTTP handlers for the daily batch tracker

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{operating_date, today, CreateStockItemRequest};
use crate::middleware::CurrentUser;
use crate::services::batch::{AddedBatch, BatchService, BatchTarget, DayBatches};
use crate::AppState;

/// Request body for adding a batch to an existing or a new item
#[derive(Debug, Deserialize, Validate)]
pub struct AddBatchRequest {
    pub stock_item_id: Option<Uuid>,
    #[validate]
    pub new_item: Option<CreateStockItemRequest>,
    pub quantity: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    /// Operating day, defaults to today
    pub date: Option<NaiveDate>,
}

/// Add a batch; the ledger is credited before the batch is logged
pub async fn add_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AddBatchRequest>,
) -> AppResult<Json<AddedBatch>> {
    input.validate()?;

    let target = match (input.stock_item_id, input.new_item) {
        (Some(id), None) => BatchTarget::Existing(id),
        (None, Some(new_item)) => BatchTarget::New(
            new_item.into_new_item(state.config.inventory.low_stock_default_threshold),
        ),
        _ => {
            return Err(AppError::validation(
                "stock_item_id",
                "provide exactly one of stock_item_id or new_item",
            ))
        }
    };

    let service = BatchService::new(state.db);
    let added = service
        .add_batch(
            target,
            input.quantity,
            input.cost_per_unit,
            input.expiry_date,
            input.date.unwrap_or_else(today),
            current_user.id(),
        )
        .await?;
    Ok(Json(added))
}

/// Batches of one operating day, newest first
pub async fn list_batches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<DayBatches>> {
    let day = operating_date(&date)?;
    let service = BatchService::new(state.db);
    let batches = service.list_batches(day).await?;
    Ok(Json(batches))
}
