//! Scheduler configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SchedulerConfig::max_concurrency`].
pub const ENV_MAX_CONCURRENCY: &str = "UNIT_SCHEDULER_MAX_CONCURRENCY";
/// Environment variable overriding [`SchedulerConfig::default_timeout_secs`].
pub const ENV_TIMEOUT_SECS: &str = "UNIT_SCHEDULER_TIMEOUT_SECS";

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of units running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Timeout for process units that do not set their own.
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

fn default_max_concurrency() -> usize {
    num_cpus::get().max(1)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            default_timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    /// Configuration with an explicit concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Configuration with a default process timeout.
    #[must_use]
    pub const fn with_default_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = Some(secs);
        self
    }

    /// Default process timeout as a duration.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".into());
        }
        if self.default_timeout_secs == Some(0) {
            return Err("default_timeout_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but unparsable, or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(format!(".env error: {e}"));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but unparsable, or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(max) = parse_var::<usize>(&lookup, ENV_MAX_CONCURRENCY)? {
            cfg.max_concurrency = max;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_TIMEOUT_SECS)? {
            cfg.default_timeout_secs = Some(secs);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}={raw:?}: {e}"))
        })
        .transpose()
}
