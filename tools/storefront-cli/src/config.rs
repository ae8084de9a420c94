//! CLI configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use turbo_commerce::coupon::RevalidationPolicy;
use turbo_commerce::money::Currency;
use turbo_data::{ApiConfig, BackoffStrategy, RetryPolicy};
use turbo_observability::LogSettings;

/// File names searched for, from the working directory upwards.
pub const CONFIG_NAMES: [&str; 3] = ["shop.toml", ".shop.toml", "shop.json"];

/// Overrides `api.base_url`.
pub const API_URL_ENV: &str = "SHOP_API_URL";

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub checkout: CheckoutSection,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply an API URL taken from the environment.
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        self
    }

    /// Client settings for the configured API.
    pub fn api_config(&self) -> ApiConfig {
        let backoff = BackoffStrategy::Exponential {
            base: Duration::from_millis(self.api.retry_backoff_ms),
            max: Duration::from_secs(5),
        };
        let mut config = ApiConfig::new(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs))
            .with_retry(RetryPolicy::new(self.api.retries).with_backoff(backoff))
            .with_currency(self.checkout.currency);
        config.connect_timeout = Duration::from_secs(self.api.connect_timeout_secs);
        config
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Storefront API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retries for reads. Orders are never retried.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

fn default_backoff() -> u64 {
    200
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retries: default_retries(),
            retry_backoff_ms: default_backoff(),
        }
    }
}

/// Local state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// Where the session, carts and orders are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSection {
    #[serde(default)]
    pub currency: Currency,

    /// What happens to an applied coupon when the cart changes.
    #[serde(default)]
    pub revalidation: RevalidationPolicy,
}

/// Generate a default shop.toml config file.
pub fn generate_default_config(base_url: &str) -> String {
    format!(
        r#"# Storefront CLI configuration

[api]
base_url = "{base_url}"
timeout_secs = 30
connect_timeout_secs = 10
retries = 2
retry_backoff_ms = 200

[store]
# data_dir = "~/.local/share/shop"

[log]
level = "warn"
format = "human"

[checkout]
currency = "USD"
# "revalidate" re-checks a coupon after the cart changes,
# "clear_on_change" drops it.
revalidation = "revalidate"
"#
    )
}
