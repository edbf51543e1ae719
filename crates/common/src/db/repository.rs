//! Postgres repository
//!
//! Implements the store traits on top of the shared `DbPool`. Writes to
//! papers and keywords are single-statement unique-key upserts, so
//! overlapping ingestion runs never race on a read-then-write.

use crate::db::models::*;
use crate::db::store::{
    like_pattern, trend_window_start, PaperStore, PaperWithSummary, SearchStore, StoreStats,
    TrendStore, UpsertOutcome,
};
use crate::db::DbPool;
use crate::errors::Result;
use crate::records::PaperRecord;
use crate::{FEED_CATEGORY_SOURCE, SEARCH_RESULT_CAP};
use async_trait::async_trait;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use tracing::{debug, warn};

const INSERT_PAPER_SQL: &str = r#"
    INSERT INTO papers (
        external_id, title, abstract_text, authors, categories,
        published_date, source_url, document_url
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (external_id) DO NOTHING
"#;

const SEED_KEYWORD_SQL: &str = r#"
    INSERT INTO keywords (paper_id, keyword, source, confidence, category)
    SELECT p.id, $2, $3, $4, $2
    FROM papers p
    WHERE p.external_id = $1
    ON CONFLICT (paper_id, keyword, source) DO NOTHING
"#;

const SEARCH_SQL: &str = r#"
    SELECT p.*, s.summary_text, s.generated_image_url
    FROM papers p
    LEFT JOIN LATERAL (
        SELECT summary_text, generated_image_url
        FROM summaries
        WHERE summaries.paper_id = p.id
        ORDER BY created_at DESC, id DESC
        LIMIT 1
    ) s ON TRUE
    WHERE p.title ILIKE $1
       OR p.abstract_text ILIKE $1
       OR EXISTS (
           SELECT 1 FROM keywords k
           WHERE k.paper_id = p.id AND k.keyword ILIKE $1
       )
    ORDER BY p.published_date DESC NULLS LAST, p.id DESC
    LIMIT $2
"#;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }
}

#[async_trait]
impl PaperStore for Repository {
    async fn upsert_paper(&self, paper: &PaperRecord) -> Result<UpsertOutcome> {
        let published_date = paper.published_date();
        if published_date.is_none() {
            warn!(
                external_id = %paper.external_id,
                published = %paper.published,
                "Feed entry has no usable publication date, storing NULL"
            );
        }

        let txn = self.conn().begin().await?;

        let insert = Statement::from_sql_and_values(
            DbBackend::Postgres,
            INSERT_PAPER_SQL,
            vec![
                paper.external_id.clone().into(),
                paper.title.clone().into(),
                paper.abstract_text.clone().into(),
                serde_json::json!(paper.authors).into(),
                serde_json::json!(paper.categories).into(),
                published_date.into(),
                paper.source_url.clone().into(),
                paper.document_url.clone().into(),
            ],
        );
        let inserted = txn.execute(insert).await?.rows_affected() > 0;

        let mut keywords_seeded = 0;
        for category in &paper.categories {
            let seed = Statement::from_sql_and_values(
                DbBackend::Postgres,
                SEED_KEYWORD_SQL,
                vec![
                    paper.external_id.clone().into(),
                    category.clone().into(),
                    FEED_CATEGORY_SOURCE.into(),
                    1.0_f64.into(),
                ],
            );
            keywords_seeded += txn.execute(seed).await?.rows_affected();
        }

        let paper_id = PaperEntity::find()
            .select_only()
            .column(PaperColumn::Id)
            .filter(PaperColumn::ExternalId.eq(paper.external_id.as_str()))
            .into_tuple::<i32>()
            .one(&txn)
            .await?;

        txn.commit().await?;

        debug!(
            external_id = %paper.external_id,
            inserted,
            keywords_seeded,
            "Paper upserted"
        );

        Ok(UpsertOutcome {
            paper_id,
            inserted,
            keywords_seeded,
        })
    }

    async fn recent_papers(&self, limit: u64, offset: u64) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .order_by_with_nulls(PaperColumn::PublishedDate, Order::Desc, NullOrdering::Last)
            .order_by_desc(PaperColumn::Id)
            .limit(limit)
            .offset(offset)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_summary(&self, paper_id: i32) -> Result<Option<Summary>> {
        SummaryEntity::find()
            .filter(SummaryColumn::PaperId.eq(paper_id))
            .order_by_desc(SummaryColumn::CreatedAt)
            .order_by_desc(SummaryColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();

        Ok(StoreStats {
            total_papers: PaperEntity::find().count(conn).await?,
            total_keywords: KeywordEntity::find().count(conn).await?,
            total_trends: TrendEntity::find().count(conn).await?,
            total_summaries: SummaryEntity::find().count(conn).await?,
            summaries_with_images: SummaryEntity::find()
                .filter(SummaryColumn::GeneratedImageUrl.is_not_null())
                .count(conn)
                .await?,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl TrendStore for Repository {
    async fn recent_trending(&self, limit: u64) -> Result<Vec<Trend>> {
        let cutoff = trend_window_start(chrono::Utc::now().date_naive());

        TrendEntity::find()
            .filter(TrendColumn::WeekStart.gte(cutoff))
            .order_by_desc(TrendColumn::TrendingScore)
            .order_by_desc(TrendColumn::Frequency)
            .order_by_asc(TrendColumn::Keyword)
            .order_by_asc(TrendColumn::Id)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl SearchStore for Repository {
    async fn search(&self, query: &str) -> Result<Vec<PaperWithSummary>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            SEARCH_SQL,
            vec![like_pattern(query.trim()).into(), (SEARCH_RESULT_CAP as i64).into()],
        );

        self.conn()
            .query_all(stmt)
            .await?
            .into_iter()
            .map(|row| -> Result<PaperWithSummary> {
                Ok(PaperWithSummary {
                    paper: Paper::from_query_result(&row, "")?,
                    summary_text: row.try_get("", "summary_text")?,
                    generated_image_url: row.try_get("", "generated_image_url")?,
                })
            })
            .collect()
    }
}

/// Exercised against a disposable Postgres database:
/// `DATABASE_URL=postgres://... cargo test -p paperpulse-common -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    async fn repository() -> Repository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let config = DatabaseConfig {
            url,
            ..DatabaseConfig::default()
        };
        let pool = DbPool::new(&config).await.unwrap();
        pool.migrate().await.unwrap();
        Repository::new(pool)
    }

    /// Ids unique per test run, so a shared database needs no cleanup
    fn unique(prefix: &str) -> String {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{}-{}", prefix, nanos)
    }

    fn record(id: &str, title: &str, published: &str, categories: &[&str]) -> PaperRecord {
        PaperRecord {
            external_id: id.to_string(),
            title: title.to_string(),
            abstract_text: "An abstract".to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            categories: categories.iter().map(|c| c.to_string()).collect(),
            published: published.to_string(),
            links: vec![],
            source_url: format!("https://arxiv.org/abs/{}", id),
            document_url: format!("https://arxiv.org/pdf/{}.pdf", id),
        }
    }

    async fn keywords(repo: &Repository, paper_id: i32) -> Vec<Keyword> {
        KeywordEntity::find()
            .filter(KeywordColumn::PaperId.eq(paper_id))
            .all(repo.conn())
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_upsert_skips_existing_rows() {
        let repo = repository().await;
        let id = unique("upsert");
        let paper = record(&id, "Idempotent", "2024-01-02T00:00:00Z", &["cs.HC", "cs.AI"]);

        let first = repo.upsert_paper(&paper).await.unwrap();
        assert!(first.inserted);
        assert_eq!(first.keywords_seeded, 2);
        assert!(first.paper_id.is_some());

        let second = repo.upsert_paper(&paper).await.unwrap();
        assert!(!second.inserted);
        assert_eq!(second.keywords_seeded, 0);
        assert_eq!(second.paper_id, first.paper_id);

        let paper_id = first.paper_id.unwrap();
        let seeded = keywords(&repo, paper_id).await;
        assert_eq!(seeded.len(), 2);
        for keyword in &seeded {
            assert_eq!(keyword.source, FEED_CATEGORY_SOURCE);
            assert_eq!(keyword.confidence, 1.0);
            assert_eq!(keyword.category.as_deref(), Some(keyword.keyword.as_str()));
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_reseeding_adds_only_new_categories() {
        let repo = repository().await;
        let id = unique("reseed");

        let first = repo
            .upsert_paper(&record(&id, "Seeds", "2024-01-02", &["cs.HC"]))
            .await
            .unwrap();
        let second = repo
            .upsert_paper(&record(&id, "Seeds", "2024-01-02", &["cs.HC", "cs.RO"]))
            .await
            .unwrap();

        assert!(!second.inserted);
        assert_eq!(second.keywords_seeded, 1);
        assert_eq!(keywords(&repo, first.paper_id.unwrap()).await.len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_search_escapes_wildcards_and_orders_nulls_last() {
        let repo = repository().await;
        let token = unique("token");

        let percent = record(&unique("pct"), &format!("Gaze 100% {}", token), "2024-01-02", &[]);
        let digits = record(&unique("dig"), &format!("Gaze 1000 {}", token), "", &[]);
        repo.upsert_paper(&percent).await.unwrap();
        repo.upsert_paper(&digits).await.unwrap();

        let hits = repo.search(&format!("100% {}", token)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.paper.external_id.as_str()).collect();
        assert_eq!(ids, vec![percent.external_id.as_str()]);

        // Case-insensitive; the undated paper sorts after the dated one
        let hits = repo.search(&token.to_uppercase()).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.paper.external_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![percent.external_id.as_str(), digits.external_id.as_str()]
        );
        assert!(hits[1].paper.published_date.is_none());
        assert!(hits[0].summary_text.is_none());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_search_matches_keywords() {
        let repo = repository().await;
        let category = unique("cat");
        let paper = record(&unique("kw"), "Untitled", "2024-01-02", &[category.as_str()]);
        repo.upsert_paper(&paper).await.unwrap();

        let hits = repo.search(&category).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.external_id, paper.external_id);
    }
}
