use serde::Deserialize;

/// Main configuration structure for Feed-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub profiles: Vec<String>,
}

/// Crawl scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of newest posts requested per profile
    #[serde(rename = "max-posts-per-profile")]
    pub max_posts_per_profile: usize,

    /// Number of chunks each profile's post range is split into
    #[serde(rename = "chunks-per-profile")]
    pub chunks_per_profile: usize,

    /// Number of parallel profile workers
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Listing attempts a chunk may spend before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    4
}

/// Self-imposed delays (milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// Chance of pausing after emitting a post
    #[serde(rename = "emit-delay-probability")]
    pub emit_delay_probability: f64,

    #[serde(rename = "emit-delay-min-ms")]
    pub emit_delay_min_ms: u64,

    #[serde(rename = "emit-delay-max-ms")]
    pub emit_delay_max_ms: u64,

    /// Jitter added on top of the source-suggested wait after a 429
    #[serde(rename = "rate-limit-jitter-min-ms")]
    pub rate_limit_jitter_min_ms: u64,

    #[serde(rename = "rate-limit-jitter-max-ms")]
    pub rate_limit_jitter_max_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            emit_delay_probability: 0.2,
            emit_delay_min_ms: 2000,
            emit_delay_max_ms: 5000,
            rate_limit_jitter_min_ms: 1000,
            rate_limit_jitter_max_ms: 3000,
        }
    }
}

/// Data source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the post listing service
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Offline fixture file used instead of the network
    #[serde(rename = "fixture-path")]
    pub fixture_path: Option<String>,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Crawl sessions shared out as credential pairs
    #[serde(rename = "session", default)]
    pub sessions: Vec<SessionEntry>,
}

fn default_user_agent() -> String {
    format!("feed-harvest/{}", env!("CARGO_PKG_VERSION"))
}

/// A named crawl session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEntry {
    pub name: String,

    /// Session token; anonymous when absent
    #[serde(default)]
    pub token: Option<String>,
}

/// Ingest sink output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON array file the crawl streams into
    pub path: String,

    /// Records buffered before a flush
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    100
}

/// Post store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// JSON collection file backing the post store
    pub path: String,

    /// Directory for on-demand crawl output
    #[serde(rename = "scratch-dir", default = "default_scratch_dir")]
    pub scratch_dir: String,
}

fn default_scratch_dir() -> String {
    "./live_data".to_string()
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}
