//! Configuration management for PaperPulse services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// External feed configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// Ingestion run configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Scheduled trigger configuration
    #[serde(default)]
    pub cron: CronConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending migrations when a service starts
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Query endpoint of the external feed
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,

    /// Fixed category allow-list, OR-ed together
    #[serde(default = "default_feed_categories")]
    pub categories: Vec<String>,

    /// Free-text terms combined with the category filter
    #[serde(default = "default_feed_query")]
    pub query: String,

    /// Used when a trigger does not say how many results to fetch
    #[serde(default = "default_max_results")]
    pub default_max_results: i64,

    /// Upper bound for a single fetch
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: i64,

    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// Base for constructed abstract-page URLs
    #[serde(default = "default_abs_base")]
    pub abs_base: String,

    /// Base for constructed document URLs
    #[serde(default = "default_pdf_base")]
    pub pdf_base: String,

    /// User agent sent to the feed
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Records persisted concurrently within one run (1 = sequential)
    #[serde(default = "default_store_concurrency")]
    pub store_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CronConfig {
    /// Shared secret expected as `Authorization: Bearer <secret>`.
    /// When unset every scheduled trigger is rejected.
    pub secret: Option<String>,

    /// Base URL of the worker that runs ingestion
    #[serde(default = "default_worker_url")]
    pub worker_url: String,

    /// `maxResults` forwarded to the worker
    #[serde(default = "default_max_results")]
    pub max_results: i64,

    /// Timeout for the worker call in seconds
    #[serde(default = "default_cron_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "paperpulse=debug,info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_concurrent() -> usize { 100 }
fn default_database_url() -> String { "postgres://localhost/paperpulse".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_feed_base_url() -> String { "http://export.arxiv.org/api/query".to_string() }
fn default_feed_categories() -> Vec<String> {
    ["cs.HC", "cs.AI", "cs.CY", "cs.CV", "cs.LG"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_feed_query() -> String {
    "human computer interaction OR HCI OR human-computer interaction".to_string()
}
fn default_max_results() -> i64 { 20 }
fn default_max_results_cap() -> i64 { 500 }
fn default_feed_timeout() -> u64 { 30 }
fn default_abs_base() -> String { "https://arxiv.org/abs".to_string() }
fn default_pdf_base() -> String { "https://arxiv.org/pdf".to_string() }
fn default_user_agent() -> String { format!("paperpulse/{}", crate::VERSION) }
fn default_store_concurrency() -> usize { 1 }
fn default_worker_url() -> String { "http://localhost:8080".to_string() }
fn default_cron_timeout() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("feed.categories")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl FeedConfig {
    /// Get feed timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Clamp a caller-supplied result count into `1..=max_results_cap`
    pub fn clamp_max_results(&self, requested: i64) -> u32 {
        let cap = self.max_results_cap.max(1);
        requested.clamp(1, cap) as u32
    }
}

impl CronConfig {
    /// Get worker call timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_enabled(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            categories: default_feed_categories(),
            query: default_feed_query(),
            default_max_results: default_max_results(),
            max_results_cap: default_max_results_cap(),
            timeout_secs: default_feed_timeout(),
            abs_base: default_abs_base(),
            pdf_base: default_pdf_base(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            store_concurrency: default_store_concurrency(),
        }
    }
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: None,
            worker_url: default_worker_url(),
            max_results: default_max_results(),
            timeout_secs: default_cron_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            feed: FeedConfig::default(),
            ingestion: IngestionConfig::default(),
            cron: CronConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
