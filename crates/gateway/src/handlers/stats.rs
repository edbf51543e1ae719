//! Table count handler

use axum::{extract::State, Json};

use crate::AppState;
use paperpulse_common::{db::StoreStats, errors::Result, ApiResponse};

pub async fn stats(State(state): State<AppState>) -> Result<Json<ApiResponse<StoreStats>>> {
    let stats = state.store.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
