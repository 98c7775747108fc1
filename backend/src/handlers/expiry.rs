//! HTTP handlers for expiry processing and waste

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{DateRange, SweepReport, WasteRecord};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::{ExpiryService, StockService, WasteService};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub updated: u64,
}

/// Query parameters for listing waste
#[derive(Debug, Deserialize)]
pub struct WasteQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Run the expiry sweep now
pub async fn sweep_expired(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SweepReport>> {
    let service = ExpiryService::new(state.db);
    let report = service.sweep_expired(Some(current_user.id())).await?;
    Ok(Json(report))
}

/// Mark past-expiry items as expired without moving stock
pub async fn refresh_expired_statuses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<RefreshResponse>> {
    let service = StockService::new(state.db);
    let updated = service.refresh_expired_statuses().await?;
    Ok(Json(RefreshResponse { updated }))
}

pub async fn list_waste(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<WasteQuery>,
) -> AppResult<Json<Vec<WasteRecord>>> {
    let range = match (query.start, query.end) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        (None, None) => None,
        _ => return Err(AppError::validation("start", "start and end must be given together")),
    };

    let service = WasteService::new(state.db);
    let records = service.list_waste(range).await?;
    Ok(Json(records))
}
