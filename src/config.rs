use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub costs: CostsConfig,
}

/// Remote data API endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint URL
    pub url: String,
    /// API key sent as x-api-key
    pub key: String,
    /// Account scope for every query
    pub account_id: String,
    /// HTTP timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Defaults for the feedback analysis commands
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Default window for `summary` (default: 14)
    pub summary_days: i64,
    /// Default window for `find` and `dataset` (default: 30)
    pub find_days: i64,
    /// Fan-out width for all-scorecards feedback analysis (default: 10)
    pub feedback_concurrency: usize,
}

/// Defaults for the cost analysis command
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostsConfig {
    /// Default window in hours (default: 1); days are used when hours is
    /// explicitly cleared
    pub hours: i64,
    pub days: i64,
    /// Fan-out width for all-scorecards cost analysis (default: 4)
    pub concurrency: usize,
}

/// Configuration overrides collected from the command line (highest
/// priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<String>,
    pub account_id: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file
    /// support.
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, anyhow::Error> {
        // Pick up a local .env before reading the environment
        dotenvy::dotenv().ok();

        // 1. Load from config file (use CLI --config if provided)
        let config_path = overrides.config_path.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::debug!("Configuration file not found, using defaults");
            Config::default()
        };

        // 2. Override with environment variables
        config.apply_env_overrides();

        // 3. Override with command line arguments (highest priority)
        config.apply_cli_overrides(overrides);

        // 4. Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - APP_API_URL: GraphQL endpoint URL
    /// - APP_API_KEY: API key
    /// - APP_ACCOUNT_ID: Account scope
    /// - APP_API_TIMEOUT_SECS: HTTP timeout in seconds
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,concord=debug")
    /// - APP_LOG_FILE: Log file path
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("APP_API_URL") {
            self.api.url = url;
        }

        if let Ok(key) = std::env::var("APP_API_KEY") {
            self.api.key = key;
        }

        if let Ok(account_id) = std::env::var("APP_ACCOUNT_ID") {
            self.api.account_id = account_id;
        }

        if let Ok(timeout) = std::env::var("APP_API_TIMEOUT_SECS")
            && let Ok(value) = timeout.parse()
        {
            self.api.timeout_secs = value;
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(file) = std::env::var("APP_LOG_FILE") {
            self.logging.file = Some(file);
        }
    }

    /// Apply command line overrides (highest priority)
    fn apply_cli_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(account_id) = &overrides.account_id {
            self.api.account_id = account_id.clone();
        }

        if let Some(url) = &overrides.api_url {
            self.api.url = url.clone();
        }

        if let Some(key) = &overrides.api_key {
            self.api.key = key.clone();
        }

        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api.url.is_empty() {
            anyhow::bail!("API URL is required (api.url, APP_API_URL, or --api-url)");
        }
        if self.api.key.is_empty() {
            anyhow::bail!("API key is required (api.key, APP_API_KEY, or --api-key)");
        }
        if self.api.account_id.is_empty() {
            anyhow::bail!("Account id is required (api.account_id, APP_ACCOUNT_ID, or --account)");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be > 0");
        }
        if self.analysis.summary_days < 1 || self.analysis.find_days < 1 {
            anyhow::bail!("analysis day defaults must be >= 1");
        }
        if self.costs.hours < 1 {
            anyhow::bail!("costs.hours must be >= 1");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            account_id: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,concord=debug".to_string(), file: None }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { summary_days: 14, find_days: 30, feedback_concurrency: 10 }
    }
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self { hours: 1, days: 7, concurrency: 4 }
    }
}
