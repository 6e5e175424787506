use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::strategy::{ThresholdError, Thresholds};

const DEFAULT_CONFIG_FILE: &str = "dipbot";
const ENV_PREFIX: &str = "DIPBOT";

pub const TESTNET_BASE_URL: &str = "https://testnet.binance.vision";
pub const MAINNET_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
}

/// Runtime settings for the bot
///
/// Layered from built-in defaults, an optional `dipbot.toml`, then
/// `DIPBOT_*` environment variables (nested keys use `__`, e.g.
/// `DIPBOT_THRESHOLDS__ENTRY`).
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    pub quantity: Decimal,
    /// Exchange candle interval code, e.g. "1m"
    pub interval: String,
    /// Candles per evaluation window
    pub lookback: usize,
    pub poll_interval_secs: u64,
    pub testnet: bool,
    /// Overrides the testnet/mainnet endpoint
    pub base_url: Option<String>,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub thresholds: Thresholds,
}

impl BotConfig {
    /// Load from `path` (or `dipbot.toml` if present) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        Self::build(path, env)
    }

    fn build(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = Thresholds::default();

        let mut builder = Config::builder()
            .set_default("symbol", "BTCUSDT")?
            .set_default("quantity", "0.1")?
            .set_default("interval", "1m")?
            .set_default("lookback", 30_i64)?
            .set_default("poll_interval_secs", 5_i64)?
            .set_default("testnet", true)?
            .set_default("rate_limit_per_minute", 1200_i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("thresholds.entry", defaults.entry.to_string())?
            .set_default("thresholds.exit_gain", defaults.exit_gain.to_string())?
            .set_default("thresholds.exit_loss", defaults.exit_loss.to_string())?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config: BotConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".to_string()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.lookback < 2 {
            return Err(ConfigError::Invalid(format!(
                "lookback must be at least 2 candles, got {}",
                self.lookback
            )));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit_per_minute must be positive".to_string(),
            ));
        }
        self.thresholds.validate()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Endpoint for the selected environment
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.testnet) {
            (Some(url), _) => url,
            (None, true) => TESTNET_BASE_URL,
            (None, false) => MAINNET_BASE_URL,
        }
    }

    /// Gateway settings using credentials for the selected environment
    pub fn gateway_config(&self, credentials: Credentials) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url().trim_end_matches('/').to_string(),
            credentials,
            rate_limit_per_minute: self.rate_limit_per_minute,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// API key pair; the secret never appears in `Debug` output
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read `TESTNET_API_KEY`/`TESTNET_API_SECRET` or `API_KEY`/`API_SECRET`
    pub fn from_env(testnet: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(testnet, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(testnet: bool, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (key_var, secret_var) = if testnet {
            ("TESTNET_API_KEY", "TESTNET_API_SECRET")
        } else {
            ("API_KEY", "API_SECRET")
        };

        let fetch = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        Ok(Self::new(fetch(key_var)?, fetch(secret_var)?))
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Everything the exchange client needs; no ambient state
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub rate_limit_per_minute: u32,
    pub request_timeout: Duration,
}
