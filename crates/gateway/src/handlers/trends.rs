//! Trend read handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::{default_limit, validate};
use crate::AppState;
use paperpulse_common::{db::models::Trend, errors::Result, ApiResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct TrendParams {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
}

/// Top trends inside the trailing window
pub async fn list_trends(
    State(state): State<AppState>,
    params: std::result::Result<Query<TrendParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Trend>>>> {
    let Query(params) = params?;
    validate(&params)?;

    let trends = state.store.recent_trending(params.limit).await?;

    Ok(Json(ApiResponse::ok(trends)))
}
