//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use turbo_auth::Session;
use turbo_cache::{cache_key, Cache};
use turbo_data::ApiClient;
use turbo_storefront::{Storefront, StorefrontOptions};

use crate::config::{CliConfig, API_URL_ENV, CONFIG_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    pub config: CliConfig,
    /// File the config was read from, if any.
    pub config_path: Option<PathBuf>,
    pub output: Output,
    pub cwd: PathBuf,
}

/// Everything a shopping command needs.
pub struct Shop {
    pub api: Arc<ApiClient>,
    pub store: Storefront,
    cache: Cache,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                (CliConfig::load(&path)?, Some(path))
            }
            None => match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (CliConfig::default(), None),
            },
        };
        let config = config.with_api_url(std::env::var(API_URL_ENV).ok());

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(CliConfig, PathBuf)> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    if let Ok(config) = CliConfig::load(&config_path) {
                        return Some((config, config_path));
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Directory holding the session, carts and orders.
    pub fn data_dir(&self) -> PathBuf {
        match &self.config.store.data_dir {
            Some(dir) => self.resolve_path(dir),
            None => dirs_path().join("shop"),
        }
    }

    pub fn api(&self) -> Result<Arc<ApiClient>> {
        let client = ApiClient::new(self.config.api_config())
            .with_context(|| format!("Invalid API URL: {}", self.config.api.base_url))?;
        Ok(Arc::new(client))
    }

    /// Restore the session and build a storefront over it.
    pub fn shop(&self) -> Result<Shop> {
        let dir = self.data_dir();
        let cache = Cache::open(&dir)
            .with_context(|| format!("Failed to open data directory: {}", dir.display()))?;
        let session = Arc::new(Session::restore(cache.clone()).context("Failed to restore session")?);
        let api = self.api()?;
        let store = Storefront::new(
            session,
            api.clone(),
            api.clone(),
            StorefrontOptions {
                currency: self.config.checkout.currency,
                policy: self.config.checkout.revalidation,
            },
        )
        .context("Failed to load cart")?;
        self.output.debug(&format!("Data directory: {}", dir.display()));
        Ok(Shop { api, store, cache })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

impl Shop {
    /// Coupon code the shopper applied in an earlier run.
    ///
    /// Coupon state lives only as long as a process, so the CLI keeps the
    /// code and validates it again on every run that needs it.
    pub fn saved_coupon(&self) -> Result<Option<String>> {
        Ok(self.cache.get(&self.coupon_key())?)
    }

    pub fn save_coupon(&self, code: &str) -> Result<()> {
        self.cache.set(&self.coupon_key(), &code)?;
        Ok(())
    }

    pub fn forget_coupon(&self) -> Result<()> {
        self.cache.delete(&self.coupon_key())?;
        Ok(())
    }

    /// Re-apply the saved coupon to the current cart.
    ///
    /// A coupon the server no longer accepts is forgotten.
    pub async fn restore_coupon(&self) -> Result<Option<String>> {
        let Some(code) = self.saved_coupon()? else {
            return Ok(None);
        };
        if self.store.cart().is_empty() {
            return Ok(None);
        }
        match self.store.apply_coupon(&code).await {
            Ok(_) => Ok(Some(code)),
            Err(e) => {
                self.forget_coupon()?;
                Err(anyhow::Error::new(e).context(format!("Coupon {code} no longer applies")))
            }
        }
    }

    fn coupon_key(&self) -> String {
        coupon_key(self.store.session().username().as_deref())
    }
}

/// Guest and user coupons live under keys that cannot collide.
fn coupon_key(owner: Option<&str>) -> String {
    match owner {
        Some(username) => cache_key!("coupon", "user", username),
        None => cache_key!("coupon", "guest"),
    }
}

/// Get the platform-specific data directory.
fn dirs_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        std::env::temp_dir()
    }
}
