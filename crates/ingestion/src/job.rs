//! One ingestion run: fetch, parse, store
//!
//! A run fetches the feed once, parses the whole batch, then hands each
//! record to the store on its own. A failed record is logged and counted;
//! it never aborts the batch. Only a failed fetch ends a run early.

use crate::feed::{FeedClient, FeedParser};
use futures::stream::{self, StreamExt};
use paperpulse_common::config::{AppConfig, FeedConfig};
use paperpulse_common::db::{PaperStore, UpsertOutcome};
use paperpulse_common::errors::Result;
use paperpulse_common::metrics;
use paperpulse_common::records::PaperRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Result of one run. Always produced, even when the fetch fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub run_id: Uuid,
    /// Records parsed from the feed and handed to the store
    pub stored_count: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    #[serde(skip)]
    pub papers: Vec<PaperRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionReport {
    fn fetch_failed(run_id: Uuid, error: String) -> Self {
        Self {
            run_id,
            stored_count: 0,
            inserted: 0,
            duplicates: 0,
            failed: 0,
            papers: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn message(&self) -> String {
        format!("Fetched and stored {} papers", self.stored_count)
    }
}

/// Orchestrates FeedClient -> FeedParser -> PaperStore
pub struct IngestionJob {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn PaperStore>,
    parser: FeedParser,
    feed_config: FeedConfig,
    store_concurrency: usize,
}

impl IngestionJob {
    pub fn new(feed: Arc<dyn FeedClient>, store: Arc<dyn PaperStore>, config: &AppConfig) -> Self {
        Self {
            feed,
            store,
            parser: FeedParser::from_config(&config.feed),
            feed_config: config.feed.clone(),
            store_concurrency: config.ingestion.store_concurrency.max(1),
        }
    }

    /// Run with the configured free-text query
    pub async fn run(&self, max_results: i64) -> IngestionReport {
        self.run_query(&self.feed_config.query, max_results).await
    }

    /// Run with an explicit free-text query
    pub async fn run_query(&self, query: &str, max_results: i64) -> IngestionReport {
        let run_id = Uuid::new_v4();
        self.execute(run_id, query, max_results)
            .instrument(info_span!("ingestion_run", %run_id))
            .await
    }

    async fn execute(&self, run_id: Uuid, query: &str, max_results: i64) -> IngestionReport {
        let started = Instant::now();
        let max_results = self.feed_config.clamp_max_results(max_results);
        info!(max_results, "Starting ingestion run");

        let raw = match self.feed.fetch(query, max_results).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Feed fetch failed");
                metrics::record_feed_error();
                return IngestionReport::fetch_failed(run_id, e.to_string());
            }
        };

        let papers = self.parser.parse(&raw);

        // Futures are built up front so the run future stays Send for axum
        let pending: Vec<_> = papers.iter().map(|paper| self.store_one(paper)).collect();
        let outcomes: Vec<Result<UpsertOutcome>> = stream::iter(pending)
            .buffer_unordered(self.store_concurrency)
            .collect()
            .await;

        let mut report = IngestionReport {
            run_id,
            stored_count: papers.len(),
            inserted: 0,
            duplicates: 0,
            failed: 0,
            papers: Vec::new(),
            error: None,
        };
        for outcome in &outcomes {
            match outcome {
                Ok(o) if o.inserted => report.inserted += 1,
                Ok(_) => report.duplicates += 1,
                Err(_) => report.failed += 1,
            }
        }
        report.papers = papers;

        let elapsed = started.elapsed();
        metrics::record_ingestion(
            elapsed.as_secs_f64(),
            report.inserted,
            report.duplicates,
            report.failed,
        );

        info!(
            parsed = report.stored_count,
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            duration_ms = elapsed.as_millis() as u64,
            "Ingestion run complete"
        );

        report
    }

    async fn store_one(&self, paper: &PaperRecord) -> Result<UpsertOutcome> {
        let result = self.store.upsert_paper(paper).await;
        if let Err(e) = &result {
            error!(external_id = %paper.external_id, error = %e, "Failed to store paper");
        }
        result
    }
}
