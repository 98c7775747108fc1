//! HTTP handlers for the stock ledger

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    Freshness, IngredientCategory, MovementReason, NewStockItem, StockItem, StockMovement,
    StorageCondition, Unit,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::today;
use crate::middleware::CurrentUser;
use crate::services::batch::{BatchService, Deduction};
use crate::services::stock::{ItemFilter, StockService};
use crate::AppState;

/// Request body for creating a stock item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStockItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub category: IngredientCategory,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub storage_condition: StorageCondition,
    #[validate(length(max = 200))]
    pub supplier: Option<String>,
    pub initial_quantity: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub min_threshold: Option<Decimal>,
    pub max_threshold: Option<Decimal>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub freshness: Option<Freshness>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateStockItemRequest {
    /// `default_threshold` applies when the request leaves the minimum unset
    pub fn into_new_item(self, default_threshold: Decimal) -> NewStockItem {
        NewStockItem {
            name: self.name,
            category: self.category,
            unit: self.unit,
            storage_condition: self.storage_condition,
            supplier: self.supplier,
            initial_quantity: self.initial_quantity.unwrap_or(Decimal::ZERO),
            cost: self.cost,
            min_threshold: self.min_threshold.unwrap_or(default_threshold),
            max_threshold: self.max_threshold,
            expiry_date: self.expiry_date,
            freshness: self.freshness,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    /// Signed change to apply
    pub delta: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    pub quantity: Decimal,
    /// Operating day whose batches are consumed, defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SetDiscontinuedRequest {
    pub discontinued: bool,
}

/// Create a stock item
pub async fn create_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockItemRequest>,
) -> AppResult<Json<StockItem>> {
    input.validate()?;
    let new_item = input.into_new_item(state.config.inventory.low_stock_default_threshold);
    let service = StockService::new(state.db);
    let item = service.create_item(new_item, current_user.id()).await?;
    Ok(Json(item))
}

/// List stock items, optionally filtered by status or name
pub async fn list_stock_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ItemFilter>,
) -> AppResult<Json<Vec<StockItem>>> {
    let service = StockService::new(state.db);
    let items = service.list_items(filter).await?;
    Ok(Json(items))
}

pub async fn get_stock_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db);
    let item = service.get_item(item_id).await?;
    Ok(Json(item))
}

/// Manual signed adjustment of the ledger
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<AdjustStockRequest>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db);
    let item = service
        .adjust_stock(
            item_id,
            input.delta,
            MovementReason::ManualAdjustment,
            current_user.id(),
        )
        .await?;
    Ok(Json(item))
}

/// Deduct consumed stock and walk that day's batches FIFO
pub async fn deduct_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<DeductRequest>,
) -> AppResult<Json<Deduction>> {
    let service = BatchService::new(state.db);
    let day = input.date.unwrap_or_else(today);
    let deduction = service
        .deduct(item_id, input.quantity, day, current_user.id())
        .await?;
    Ok(Json(deduction))
}

pub async fn set_discontinued(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<SetDiscontinuedRequest>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db);
    let item = service
        .set_discontinued(item_id, input.discontinued, current_user.id())
        .await?;
    Ok(Json(item))
}

/// Audit trail of one item, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = StockService::new(state.db);
    let movements = service.list_movements(item_id).await?;
    Ok(Json(movements))
}
