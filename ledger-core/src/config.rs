//! Configuration management
//!
//! Settings live in `<ledger_dir>/settings.json`; every field is optional:
//! ```json
//! {
//!   "database": "ledger.duckdb",
//!   "logLevel": "warn",
//!   "retry": { "maxAttempts": 8, "baseDelayMs": 5, "maxDelayMs": 200 }
//! }
//! ```
//! Environment variables override the file (see [`Config::load`]).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE: &str = "ledger.duckdb";
const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_BASE_DELAY_MS: u64 = 5;
const DEFAULT_MAX_DELAY_MS: u64 = 200;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(default)]
    retry: RetrySettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_delay_ms: Option<u64>,
}

/// How often and how patiently a conflicting unit of work is re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping (tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `retry` (1-based): exponential, capped,
    /// with up to 50% random jitter so colliding writers spread out
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let jitter_ms = (capped.as_millis() / 2) as u64;
        if jitter_ms == 0 {
            return capped;
        }
        capped + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file name inside the ledger directory
    pub database: String,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
    pub retry: RetryPolicy,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            retry: RetryPolicy::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the ledger directory
    ///
    /// Overrides:
    /// - `LEDGER_DATABASE`
    /// - `LEDGER_RETRY_MAX_ATTEMPTS`
    /// - `LEDGER_RETRY_BASE_DELAY_MS`
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        Self::load_with_env(ledger_dir, |key| std::env::var(key).ok())
    }

    /// Load config with a custom environment lookup
    pub fn load_with_env(ledger_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = ledger_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let parse_env = |key: &str| -> Result<Option<u64>> {
            env(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{} must be a non-negative integer", key))
                })
                .transpose()
        };

        let database = env("LEDGER_DATABASE")
            .or_else(|| raw.database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let max_attempts = match parse_env("LEDGER_RETRY_MAX_ATTEMPTS")? {
            Some(n) => u32::try_from(n).context("LEDGER_RETRY_MAX_ATTEMPTS is too large")?,
            None => raw.retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        };
        let base_delay_ms = parse_env("LEDGER_RETRY_BASE_DELAY_MS")?
            .or(raw.retry.base_delay_ms)
            .unwrap_or(DEFAULT_BASE_DELAY_MS);
        let max_delay_ms = raw.retry.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS);

        Ok(Self {
            database,
            log_level: raw
                .log_level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            retry: RetryPolicy {
                max_attempts: max_attempts.max(1),
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
            },
            _raw_settings: raw,
        })
    }

    /// Save config to the ledger directory
    /// Preserves other settings that the ledger doesn't manage
    pub fn save(&self, ledger_dir: &Path) -> Result<()> {
        let settings_path = ledger_dir.join("settings.json");

        let mut settings = self._raw_settings.clone();
        settings.database = Some(self.database.clone());
        settings.log_level = Some(self.log_level.clone());
        settings.retry = RetrySettings {
            max_attempts: Some(self.retry.max_attempts),
            base_delay_ms: Some(self.retry.base_delay.as_millis() as u64),
            max_delay_ms: Some(self.retry.max_delay.as_millis() as u64),
        };

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
