//! Application configuration management.
//!
//! Configuration is loaded once at startup into an immutable [`AppConfig`]
//! and handed to the services that need it. Nothing reads the process
//! environment after that.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Category name used when an expense category is not in a department's list.
pub const FALLBACK_CATEGORY: &str = "Others";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Language model service configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// Auto-approval and intake policy.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Report generation settings.
    #[serde(default)]
    pub reports: ReportConfig,
    /// Rendered document storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Language model service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Endpoint accepting generation requests.
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    /// Bearer token for the service.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name forwarded with every request.
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Upper bound for a single call, in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    /// Sampling temperature for report analysis.
    #[serde(default = "default_ai_temperature")]
    pub temperature: Decimal,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            api_key: None,
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
            temperature: default_ai_temperature(),
        }
    }
}

fn default_ai_endpoint() -> String {
    "http://localhost:8090/v1/generate".to_string()
}

fn default_ai_model() -> String {
    "expense-analyst".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

fn default_ai_temperature() -> Decimal {
    Decimal::new(2, 1)
}

/// Auto-approval and intake policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalConfig {
    /// Categories eligible for unattended approval when within limit.
    #[serde(default = "default_fast_track")]
    pub fast_track_categories: Vec<String>,
    /// Currency codes accepted at intake.
    #[serde(default = "default_currencies")]
    pub supported_currencies: Vec<String>,
    /// Whether non fast-track expenses go through the compliance check.
    #[serde(default = "default_true")]
    pub auto_approval_enabled: bool,
    /// Trailing window for merchant + amount duplicate detection.
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_hours: i64,
    /// Organizational policy the compliance check is matched against.
    #[serde(default = "default_policy_document")]
    pub policy_document: String,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            fast_track_categories: default_fast_track(),
            supported_currencies: default_currencies(),
            auto_approval_enabled: true,
            duplicate_window_hours: default_duplicate_window(),
            policy_document: default_policy_document(),
        }
    }
}

fn default_fast_track() -> Vec<String> {
    ["Meals", "Office Supplies", "Transportation"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "INR", "JPY", "CAD", "AUD"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_duplicate_window() -> i64 {
    24
}

fn default_policy_document() -> String {
    "Expenses must be business related, supported by a receipt, and within the \
     employee's allotted limit unless pre-approved. Alcohol, personal items, \
     and entertainment without a client present are not reimbursable."
        .to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Canonical currency all report figures are expressed in.
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,
    /// Number of merchants in the top-merchant ranking.
    #[serde(default = "default_top_merchants")]
    pub top_merchants: usize,
    /// Report id prefix for individual reports.
    #[serde(default = "default_individual_prefix")]
    pub individual_prefix: String,
    /// Report id prefix for team reports.
    #[serde(default = "default_team_prefix")]
    pub team_prefix: String,
    /// Capacity of the background render queue.
    #[serde(default = "default_render_capacity")]
    pub render_queue_capacity: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reporting_currency: default_reporting_currency(),
            top_merchants: default_top_merchants(),
            individual_prefix: default_individual_prefix(),
            team_prefix: default_team_prefix(),
            render_queue_capacity: default_render_capacity(),
        }
    }
}

fn default_reporting_currency() -> String {
    "USD".to_string()
}

fn default_top_merchants() -> usize {
    5
}

fn default_individual_prefix() -> String {
    "IND".to_string()
}

fn default_team_prefix() -> String {
    "TEAM".to_string()
}

fn default_render_capacity() -> usize {
    64
}

/// Where rendered report documents are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3.
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// Bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests only).
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::LocalFs {
            root: PathBuf::from("./data/documents"),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("EXPENSA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("approval.fast_track_categories")
                    .with_list_parse_key("approval.supported_currencies")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
