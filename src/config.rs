use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::utils::RetryConfig;

pub const DEFAULT_CONFIG_FILE: &str = "checkout.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Payment method sent with the place-order mutation
    pub payment_method_code: String,
    pub confirmation_path: String,
    /// Cache tag invalidated when the cart is torn down
    pub cart_cache_tag: String,
    pub success_dialog_timeout_ms: u64,
    pub query_retry: QueryRetrySettings,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            payment_method_code: "cashondelivery".into(),
            confirmation_path: "/order-confirmation".into(),
            cart_cache_tag: "cart".into(),
            success_dialog_timeout_ms: 3000,
            query_retry: QueryRetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryRetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for QueryRetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

impl From<&QueryRetrySettings> for RetryConfig {
    fn from(settings: &QueryRetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier,
        }
    }
}

impl CheckoutConfig {
    /// Defaults, then `checkout.toml` if present, then the environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads `path` if it exists. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read '{}'", path.display()))
            }
        };
        Self::from_toml(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CHECKOUT_PAYMENT_METHOD_CODE") {
            self.payment_method_code = v;
        }
        if let Some(v) = lookup("CHECKOUT_CONFIRMATION_PATH") {
            self.confirmation_path = v;
        }
        if let Some(v) = lookup("CHECKOUT_SUCCESS_DIALOG_TIMEOUT_MS") {
            self.success_dialog_timeout_ms = v
                .parse()
                .with_context(|| format!("CHECKOUT_SUCCESS_DIALOG_TIMEOUT_MS is not a number: '{v}'"))?;
        }
        Ok(())
    }

    pub fn success_dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.success_dialog_timeout_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.query_retry)
    }
}
