//! Ingestion trigger handler

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use paperpulse_common::{
    errors::{AppError, Result},
    records::PaperRecord,
};
use paperpulse_ingestion::IngestionReport;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub max_results: Option<i64>,
}

/// Success envelope plus the run counters
#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<PaperRecord>,
    pub stats: IngestionReport,
}

/// Run one ingestion pass. An empty body uses the configured default.
pub async fn ingest(State(state): State<AppState>, body: Bytes) -> Result<Json<IngestResponse>> {
    let request: IngestRequest = if body.iter().all(u8::is_ascii_whitespace) {
        IngestRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidFormat {
            message: format!("Invalid ingest request: {}", e),
        })?
    };

    let max_results = request
        .max_results
        .unwrap_or(state.config.feed.default_max_results);

    let mut report = state.ingestion.run(max_results).await;

    if let Some(error) = report.error.take() {
        return Err(AppError::Feed { message: error });
    }

    let papers = std::mem::take(&mut report.papers);

    Ok(Json(IngestResponse {
        success: true,
        message: report.message(),
        data: papers,
        stats: report,
    }))
}
