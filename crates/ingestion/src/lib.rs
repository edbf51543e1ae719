//! PaperPulse Ingestion
//!
//! Fetches the external paper feed, parses it into `PaperRecord`s and
//! stores them idempotently. Used by the `ingestion` binary and by the
//! gateway's ingest route.

pub mod errors;
pub mod feed;
pub mod job;

pub use errors::{FetchError, IngestionError};
pub use feed::{ArxivClient, FeedClient, FeedParser, StaticFeed};
pub use job::{IngestionJob, IngestionReport};
