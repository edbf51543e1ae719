//! In-memory store
//!
//! Mirrors the Postgres repository's semantics (unique keys, ordering,
//! trend window, search matching) without a database. Used for dry runs
//! and tests.

use crate::db::models::{Keyword, Paper, Summary, Trend};
use crate::db::store::{
    trend_window_start, PaperStore, PaperWithSummary, SearchStore, StoreStats, TrendStore,
    UpsertOutcome,
};
use crate::errors::{AppError, Result};
use crate::records::PaperRecord;
use crate::{FEED_CATEGORY_SOURCE, SEARCH_RESULT_CAP};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    papers: Vec<Paper>,
    keywords: Vec<Keyword>,
    summaries: Vec<Summary>,
    trends: Vec<Trend>,
    next_id: i32,
    failing: HashSet<String>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn latest_summary(&self, paper_id: i32) -> Option<&Summary> {
        self.summaries
            .iter()
            .filter(|s| s.paper_id == paper_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
    }
}

/// Process-local store implementing every store trait
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Make every upsert of `external_id` fail with a database error
    pub fn fail_on(&self, external_id: impl Into<String>) {
        self.state().failing.insert(external_id.into());
    }

    /// Number of read queries served (papers, trends, search)
    pub fn reads(&self) -> usize {
        self.reads.load(AtomicOrdering::Relaxed)
    }

    pub fn paper_count(&self) -> usize {
        self.state().papers.len()
    }

    pub fn papers(&self) -> Vec<Paper> {
        self.state().papers.clone()
    }

    /// Keyword rows attached to the paper with this external id
    pub fn keywords_for(&self, external_id: &str) -> Vec<Keyword> {
        let state = self.state();
        let Some(paper) = state.papers.iter().find(|p| p.external_id == external_id) else {
            return Vec::new();
        };
        state
            .keywords
            .iter()
            .filter(|k| k.paper_id == paper.id)
            .cloned()
            .collect()
    }

    /// Add a trend row, as the aggregation backend would
    pub fn insert_trend(
        &self,
        keyword: &str,
        week_start: NaiveDate,
        frequency: i32,
        trending_score: f64,
    ) -> Trend {
        let mut state = self.state();
        let trend = Trend {
            id: state.next_id(),
            keyword: keyword.to_string(),
            week_start,
            frequency,
            trending_score,
            growth_rate: None,
            created_at: Utc::now().fixed_offset(),
        };
        state.trends.push(trend.clone());
        trend
    }

    /// Attach a summary to a paper, as the summarization backend would
    pub fn insert_summary(
        &self,
        paper_id: i32,
        summary_text: &str,
        generated_image_url: Option<&str>,
    ) -> Summary {
        let mut state = self.state();
        let summary = Summary {
            id: state.next_id(),
            paper_id,
            summary_text: summary_text.to_string(),
            word_count: summary_text.split_whitespace().count() as i32,
            difficulty_level: None,
            generated_image_url: generated_image_url.map(String::from),
            created_at: Utc::now().fixed_offset(),
        };
        state.summaries.push(summary.clone());
        summary
    }
}

/// Newest publication first, undated papers last, then newest row first
fn by_recency(a: &Paper, b: &Paper) -> Ordering {
    match (a.published_date, b.published_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(b.id.cmp(&a.id))
}

fn by_trending(a: &Trend, b: &Trend) -> Ordering {
    b.trending_score
        .partial_cmp(&a.trending_score)
        .unwrap_or(Ordering::Equal)
        .then(b.frequency.cmp(&a.frequency))
        .then(a.keyword.cmp(&b.keyword))
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn upsert_paper(&self, paper: &PaperRecord) -> Result<UpsertOutcome> {
        let mut state = self.state();

        if state.failing.contains(&paper.external_id) {
            return Err(AppError::DatabaseConnection {
                message: format!("injected failure for {}", paper.external_id),
            });
        }

        let existing = state
            .papers
            .iter()
            .find(|p| p.external_id == paper.external_id)
            .map(|p| p.id);

        let (paper_id, inserted) = match existing {
            Some(id) => (id, false),
            None => {
                let id = state.next_id();
                state.papers.push(Paper {
                    id,
                    external_id: paper.external_id.clone(),
                    title: paper.title.clone(),
                    abstract_text: paper.abstract_text.clone(),
                    authors: serde_json::json!(paper.authors),
                    categories: serde_json::json!(paper.categories),
                    published_date: paper.published_date(),
                    source_url: paper.source_url.clone(),
                    document_url: paper.document_url.clone(),
                    created_at: Utc::now().fixed_offset(),
                });
                (id, true)
            }
        };

        let mut keywords_seeded = 0;
        for category in &paper.categories {
            let exists = state.keywords.iter().any(|k| {
                k.paper_id == paper_id && k.keyword == *category && k.source == FEED_CATEGORY_SOURCE
            });
            if exists {
                continue;
            }
            let id = state.next_id();
            state.keywords.push(Keyword {
                id,
                paper_id,
                keyword: category.clone(),
                source: FEED_CATEGORY_SOURCE.to_string(),
                confidence: 1.0,
                category: Some(category.clone()),
                created_at: Utc::now().fixed_offset(),
            });
            keywords_seeded += 1;
        }

        Ok(UpsertOutcome {
            paper_id: Some(paper_id),
            inserted,
            keywords_seeded,
        })
    }

    async fn recent_papers(&self, limit: u64, offset: u64) -> Result<Vec<Paper>> {
        self.record_read();
        let mut papers = self.state().papers.clone();
        papers.sort_by(by_recency);
        Ok(papers
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_summary(&self, paper_id: i32) -> Result<Option<Summary>> {
        self.record_read();
        Ok(self.state().latest_summary(paper_id).cloned())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.state();
        Ok(StoreStats {
            total_papers: state.papers.len() as u64,
            total_keywords: state.keywords.len() as u64,
            total_trends: state.trends.len() as u64,
            total_summaries: state.summaries.len() as u64,
            summaries_with_images: state
                .summaries
                .iter()
                .filter(|s| s.generated_image_url.is_some())
                .count() as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn recent_trending(&self, limit: u64) -> Result<Vec<Trend>> {
        self.record_read();
        let cutoff = trend_window_start(Utc::now().date_naive());
        let mut trends: Vec<Trend> = self
            .state()
            .trends
            .iter()
            .filter(|t| t.week_start >= cutoff)
            .cloned()
            .collect();
        trends.sort_by(by_trending);
        trends.truncate(limit as usize);
        Ok(trends)
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn search(&self, query: &str) -> Result<Vec<PaperWithSummary>> {
        self.record_read();
        let needle = query.trim().to_lowercase();
        let state = self.state();

        let mut matches: Vec<&Paper> = state
            .papers
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.abstract_text.to_lowercase().contains(&needle)
                    || state
                        .keywords
                        .iter()
                        .any(|k| k.paper_id == p.id && k.keyword.to_lowercase().contains(&needle))
            })
            .collect();
        matches.sort_by(|a, b| by_recency(a, b));

        Ok(matches
            .into_iter()
            .take(SEARCH_RESULT_CAP as usize)
            .map(|paper| {
                let summary = state.latest_summary(paper.id);
                PaperWithSummary {
                    paper: paper.clone(),
                    summary_text: summary.map(|s| s.summary_text.clone()),
                    generated_image_url: summary.and_then(|s| s.generated_image_url.clone()),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, published: &str, categories: &[&str]) -> PaperRecord {
        PaperRecord {
            external_id: id.to_string(),
            title: format!("Paper {}", id),
            abstract_text: "An abstract".to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            categories: categories.iter().map(|c| c.to_string()).collect(),
            published: published.to_string(),
            links: vec![],
            source_url: format!("https://arxiv.org/abs/{}", id),
            document_url: format!("https://arxiv.org/pdf/{}.pdf", id),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let paper = record("2401.00001", "2024-01-01T00:00:00Z", &["cs.HC", "cs.AI"]);

        let first = store.upsert_paper(&paper).await.unwrap();
        assert!(first.inserted);
        assert_eq!(first.keywords_seeded, 2);

        let second = store.upsert_paper(&paper).await.unwrap();
        assert!(!second.inserted);
        assert_eq!(second.keywords_seeded, 0);
        assert_eq!(second.paper_id, first.paper_id);

        assert_eq!(store.paper_count(), 1);
        assert_eq!(store.keywords_for("2401.00001").len(), 2);
    }

    #[tokio::test]
    async fn test_recent_papers_puts_undated_last() {
        let store = MemoryStore::new();
        store.upsert_paper(&record("a", "", &[])).await.unwrap();
        store.upsert_paper(&record("b", "2024-01-01T00:00:00Z", &[])).await.unwrap();
        store.upsert_paper(&record("c", "2024-02-01T00:00:00Z", &[])).await.unwrap();

        let ids: Vec<String> = store
            .recent_papers(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.external_id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        let page = store.recent_papers(1, 1).await.unwrap();
        assert_eq!(page[0].external_id, "b");
    }

    #[tokio::test]
    async fn test_search_matches_keywords_and_attaches_summary() {
        let store = MemoryStore::new();
        let outcome = store
            .upsert_paper(&record("2401.00002", "2024-01-01T00:00:00Z", &["cs.CY"]))
            .await
            .unwrap();
        store.insert_summary(outcome.paper_id.unwrap(), "Short summary", Some("http://img"));

        let hits = store.search("CS.cy").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].summary_text.as_deref(), Some("Short summary"));
        assert_eq!(hits[0].generated_image_url.as_deref(), Some("http://img"));

        assert!(store.search("quantum").await.unwrap().is_empty());
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.fail_on("bad");
        tokio_test::assert_err!(store.upsert_paper(&record("bad", "", &[])).await);
        tokio_test::assert_ok!(store.upsert_paper(&record("good", "", &[])).await);
        assert_eq!(store.paper_count(), 1);
    }
}
