//! Search handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::time::Instant;

use crate::AppState;
use paperpulse_common::{
    db::PaperWithSummary,
    errors::{AppError, Result},
    metrics, ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Substring search over titles, abstracts and keywords.
///
/// A missing or blank `q` is rejected before the store is touched.
pub async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<PaperWithSummary>>>> {
    let Query(params) = params?;

    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::MissingField {
            field: "q".to_string(),
        })?;

    let start = Instant::now();
    let results = state.store.search(query).await?;

    metrics::record_search(results.len());
    tracing::info!(
        query = %query,
        results = results.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Search completed"
    );

    Ok(Json(ApiResponse::ok(results)))
}
