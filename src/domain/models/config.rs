use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub fallback: FallbackScorePolicy,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".brandscore/executions.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlite:` URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Queue manager limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Agents running at once across all evaluations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Pending tasks accepted before enqueue is rejected
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// How long terminal tasks stay in memory
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

const fn default_max_concurrent() -> usize {
    3
}

const fn default_max_queue_size() -> usize {
    50
}

const fn default_cleanup_interval_secs() -> u64 {
    300
}

const fn default_retention_secs() -> u64 {
    3600
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_queue_size: default_max_queue_size(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

/// Score and confidence given to a gracefully degraded agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FallbackScorePolicy {
    /// Normalized score 0-100 of the placeholder result
    #[serde(default = "default_fallback_score")]
    pub score: f64,

    /// Confidence of the placeholder result, at most 0.2
    #[serde(default = "default_fallback_confidence")]
    pub confidence: f64,
}

/// Ceiling for placeholder confidence.
pub const MAX_FALLBACK_CONFIDENCE: f64 = 0.2;

const fn default_fallback_score() -> f64 {
    25.0
}

const fn default_fallback_confidence() -> f64 {
    0.1
}

impl Default for FallbackScorePolicy {
    fn default() -> Self {
        Self {
            score: default_fallback_score(),
            confidence: default_fallback_confidence(),
        }
    }
}

/// Which orchestration profile to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Fast agents in-process, slow agents through the queue
    #[default]
    Hybrid,
    /// Every agent in-process under the fast budget
    Performance,
}

/// Profile selection and fast phase budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationConfig {
    #[serde(default)]
    pub profile: ProfileKind,

    #[serde(default = "default_fast_budget_ms")]
    pub fast_budget_ms: u64,

    #[serde(default = "default_fast_timeout_ms")]
    pub default_fast_timeout_ms: u64,
}

const fn default_fast_budget_ms() -> u64 {
    8_000
}

const fn default_fast_timeout_ms() -> u64 {
    2_000
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            profile: ProfileKind::default(),
            fast_budget_ms: default_fast_budget_ms(),
            default_fast_timeout_ms: default_fast_timeout_ms(),
        }
    }
}

/// Slow-agent delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Try the in-process queue before any HTTP endpoint
    #[serde(default = "default_true")]
    pub in_process: bool,

    /// Base URLs tried in order
    #[serde(default)]
    pub endpoints: Vec<String>,

    #[serde(default = "default_delivery_path")]
    pub path: String,

    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

fn default_delivery_path() -> String {
    "/api/agents/dispatch".to_string()
}

const fn default_delivery_timeout_secs() -> u64 {
    30
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            in_process: true,
            endpoints: Vec::new(),
            path: default_delivery_path(),
            timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}
