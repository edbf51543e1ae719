//! Store seams shared by the Postgres repository and the in-memory store

use crate::db::models::{Paper, Summary, Trend};
use crate::errors::Result;
use crate::records::PaperRecord;
use crate::TREND_WINDOW_DAYS;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of an idempotent paper upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// Internal id of the stored row, new or pre-existing
    pub paper_id: Option<i32>,
    /// `false` when a row with the same external id already existed
    pub inserted: bool,
    /// Keyword rows actually created by this call
    pub keywords_seeded: u64,
}

/// A paper joined with its (at most one) summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperWithSummary {
    #[serde(flatten)]
    pub paper: Paper,
    pub summary_text: Option<String>,
    pub generated_image_url: Option<String>,
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_papers: u64,
    pub total_keywords: u64,
    pub total_trends: u64,
    pub total_summaries: u64,
    pub summaries_with_images: u64,
}

/// Write path for papers and their seeded keywords, plus paper reads
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Insert the paper unless its external id is already stored, then seed
    /// one `feed-category` keyword per category. Both steps are no-ops for
    /// rows that already exist.
    async fn upsert_paper(&self, paper: &PaperRecord) -> Result<UpsertOutcome>;

    /// Papers by publication date, newest first
    async fn recent_papers(&self, limit: u64, offset: u64) -> Result<Vec<Paper>>;

    /// Latest summary attached to a paper
    async fn find_summary(&self, paper_id: i32) -> Result<Option<Summary>>;

    async fn stats(&self) -> Result<StoreStats>;

    async fn ping(&self) -> Result<()>;
}

/// Time-windowed read path over trend rows
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Trends whose week started within the trailing window, highest score
    /// first. Ties: frequency desc, keyword asc, id asc.
    async fn recent_trending(&self, limit: u64) -> Result<Vec<Trend>>;
}

/// Substring search across papers and their keywords
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Case-insensitive match on title, abstract or any keyword; newest
    /// first, capped at `SEARCH_RESULT_CAP`. Callers reject blank queries.
    async fn search(&self, query: &str) -> Result<Vec<PaperWithSummary>>;
}

/// Everything the HTTP layer needs from persistence
pub trait Storage: PaperStore + TrendStore + SearchStore {}

impl<T: PaperStore + TrendStore + SearchStore> Storage for T {}

/// First `week_start` still inside the trend window ending at `today`
pub fn trend_window_start(today: NaiveDate) -> NaiveDate {
    today - chrono::Duration::days(TREND_WINDOW_DAYS)
}

/// Escape LIKE wildcards so user input only ever matches literally
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
