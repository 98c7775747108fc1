//! HTTP handler for recipe availability

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::{AvailabilityResult, RecipeIngredient};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::AvailabilityService;
use crate::AppState;

fn default_multiplier() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

/// Check whether a recipe can be produced, substituting same-name stock rows
pub async fn check_availability(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<AvailabilityRequest>,
) -> AppResult<Json<AvailabilityResult>> {
    let service = AvailabilityService::new(state.db);
    let result = service
        .check_availability(&input.ingredients, input.multiplier)
        .await?;
    Ok(Json(result))
}
