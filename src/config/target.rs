//! Target environment handed to spawned test scripts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hosts and ports of the system under test.
///
/// Process units that opt in receive `BACKEND_HOST`, `FRONTEND_HOST`, `API_URL`
/// and `FRONTEND_URL` derived from these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetEnv {
    /// Backend API host.
    pub backend_host: String,
    /// Backend API port.
    pub backend_port: u16,
    /// Frontend host.
    pub frontend_host: String,
    /// Frontend port.
    pub frontend_port: u16,
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self {
            backend_host: "localhost".into(),
            backend_port: 5000,
            frontend_host: "localhost".into(),
            frontend_port: 3000,
        }
    }
}

impl TargetEnv {
    /// Read `BACKEND_HOST`, `BACKEND_PORT`, `FRONTEND_HOST` and `FRONTEND_PORT`
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a port is set but is not a valid port number.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the target from an arbitrary variable lookup, keeping defaults for
    /// unset or empty values.
    ///
    /// # Errors
    ///
    /// Returns an error if a port is set but is not a valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let port = |key: &str, default: u16| -> Result<u16, String> {
            non_empty(key).map_or(Ok(default), |raw| {
                raw.trim().parse().map_err(|e| format!("{key}={raw:?}: {e}"))
            })
        };

        let defaults = Self::default();
        Ok(Self {
            backend_host: non_empty("BACKEND_HOST").unwrap_or(defaults.backend_host),
            backend_port: port("BACKEND_PORT", defaults.backend_port)?,
            frontend_host: non_empty("FRONTEND_HOST").unwrap_or(defaults.frontend_host),
            frontend_port: port("FRONTEND_PORT", defaults.frontend_port)?,
        })
    }

    /// Base URL of the backend API.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }

    /// Base URL of the frontend.
    #[must_use]
    pub fn frontend_url(&self) -> String {
        format!("http://{}:{}", self.frontend_host, self.frontend_port)
    }

    /// Environment overrides for a spawned unit.
    #[must_use]
    pub fn overrides(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("BACKEND_HOST".to_string(), self.backend_host.clone()),
            ("FRONTEND_HOST".to_string(), self.frontend_host.clone()),
            ("API_URL".to_string(), self.api_url()),
            ("FRONTEND_URL".to_string(), self.frontend_url()),
        ])
    }
}
