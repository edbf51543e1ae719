//! External feed access: retrieval and parsing

mod client;
mod parser;

pub use client::{search_query, ArxivClient, FeedClient, StaticFeed};
pub use parser::FeedParser;
