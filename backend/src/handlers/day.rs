//! HTTP handlers for the day lifecycle

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::{Batch, DayStatus, SweepReport};

use crate::error::AppResult;
use crate::handlers::operating_date;
use crate::middleware::CurrentUser;
use crate::services::day::{DayService, ImportSummary, StartedDay};
use crate::services::ExpiryService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct EndDayResponse {
    pub day: DayStatus,
    /// Present when the sweep runs on day end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepReport>,
}

pub async fn get_day_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<DayStatus>> {
    let day = operating_date(&date)?;
    let service = DayService::new(state.db);
    let status = service.get_day_status(day).await?;
    Ok(Json(status))
}

/// End the operating day, then sweep expired stock if configured to
pub async fn end_day(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<EndDayResponse>> {
    let day = operating_date(&date)?;
    let service = DayService::new(state.db.clone());
    let status = service.end_day(day, current_user.id()).await?;

    let sweep = if state.config.inventory.sweep_on_day_end {
        let expiry = ExpiryService::new(state.db);
        Some(expiry.sweep_expired(Some(current_user.id())).await?)
    } else {
        None
    };

    Ok(Json(EndDayResponse { day: status, sweep }))
}

/// Start the day and carry yesterday's remaining batches forward
pub async fn start_new_day(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<StartedDay>> {
    let day = operating_date(&date)?;
    let service = DayService::new(state.db);
    let started = service.start_new_day(day, current_user.id()).await?;
    Ok(Json(started))
}

pub async fn previous_day_remaining(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<Batch>>> {
    let day = operating_date(&date)?;
    let service = DayService::new(state.db);
    let batches = service.previous_day_remaining(day).await?;
    Ok(Json(batches))
}

pub async fn import_previous_day(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(date): Path<String>,
) -> AppResult<Json<ImportSummary>> {
    let day = operating_date(&date)?;
    let service = DayService::new(state.db);
    let summary = service
        .import_previous_day_remaining(day, current_user.id())
        .await?;
    Ok(Json(summary))
}
