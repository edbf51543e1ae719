//! Paper read handlers

use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::{default_limit, validate};
use crate::AppState;
use paperpulse_common::{
    db::models::{Paper, Summary},
    errors::{AppError, Result},
    ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ListPapersParams {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,

    #[serde(default)]
    pub offset: u64,
}

/// Most recently published papers
pub async fn list_papers(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListPapersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Paper>>>> {
    let Query(params) = params?;
    validate(&params)?;

    let papers = state.store.recent_papers(params.limit, params.offset).await?;

    Ok(Json(ApiResponse::ok(papers)))
}

/// Latest summary for one paper
pub async fn get_summary(
    State(state): State<AppState>,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<Summary>>> {
    let Path(paper_id) = id?;

    let summary = state
        .store
        .find_summary(paper_id)
        .await?
        .ok_or(AppError::SummaryNotFound { paper_id })?;

    Ok(Json(ApiResponse::ok(summary)))
}
