//! Scheduled trigger
//!
//! Authenticates the scheduler with a shared secret, then asks the worker
//! to run ingestion and relays whatever the worker answered.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;
use paperpulse_common::{auth::CronAuth, errors::Result, ApiResponse};

pub async fn cron(
    State(state): State<AppState>,
    _auth: CronAuth,
) -> Result<(StatusCode, Json<ApiResponse<Value>>)> {
    let cron = &state.config.cron;
    let url = format!("{}/api/ingest", cron.worker_url.trim_end_matches('/'));

    tracing::info!(%url, max_results = cron.max_results, "Cron trigger accepted");

    // Only transport failures are errors here; any worker answer is relayed
    let response = state
        .http
        .post(&url)
        .timeout(cron.timeout())
        .json(&json!({ "maxResults": cron.max_results }))
        .send()
        .await?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let text = response.text().await?;
    let worker = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        tracing::warn!(%status, "Worker rejected cron-triggered ingestion");
    }

    let mut body = ApiResponse::with_message(
        worker,
        format!("Cron job executed at {}", chrono::Utc::now().to_rfc3339()),
    );
    body.success = status.is_success();

    Ok((status, Json(body)))
}
