//! PaperPulse Common Library
//!
//! Shared code for the PaperPulse services including:
//! - Parsed feed records (`PaperRecord`)
//! - Database entities, the Postgres repository and the in-memory store
//! - Error types and the JSON response envelope
//! - Configuration management
//! - Shared-secret authentication helpers
//! - Metrics

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod records;
pub mod response;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, MemoryStore, PaperStore, Repository, SearchStore, Storage, TrendStore};
pub use errors::{AppError, Result};
pub use records::{FeedLink, PaperRecord};
pub use response::ApiResponse;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Provenance tag for keywords seeded from feed categories
pub const FEED_CATEGORY_SOURCE: &str = "feed-category";

/// Maximum number of rows returned by a search
pub const SEARCH_RESULT_CAP: u64 = 50;

/// Trailing window, in days, for trend reads
pub const TREND_WINDOW_DAYS: i64 = 30;
