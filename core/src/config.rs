//! Client configuration.
//!
//! Every field has a default matching the stock bulletin deployment, so an
//! empty TOML document is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding [`ClientConfig::api_base`].
pub const API_BASE_ENV: &str = "BULLETIN_API_BASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto.
    pub api_base: String,
    /// Cookie holding the short-lived access token.
    pub access_cookie: String,
    /// Cookie holding the refresh token.
    pub refresh_cookie: String,
    pub paths: ApiPaths,
    /// Front-end page users are sent to when their session is unrecoverable.
    pub login_page: String,
    /// Lifetime of the account cache, in milliseconds.
    pub account_cache_ttl_ms: u64,
}

/// Cookie-bearing authentication endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiPaths {
    pub login: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            access_cookie: "bulletinator_access_token".to_string(),
            refresh_cookie: "bulletinator_refresh_token".to_string(),
            paths: ApiPaths::default(),
            login_page: "/login".to_string(),
            account_cache_ttl_ms: 5000,
        }
    }
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            login: "/auth/web/login".to_string(),
            refresh: "/auth/web/refresh".to_string(),
            logout: "/auth/web/logout".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, with `api_base` taken from `BULLETIN_API_BASE` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            config.api_base = base;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    pub fn account_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.account_cache_ttl_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base).map_err(|source| ConfigError::BaseUrl {
            url: self.api_base.clone(),
            source,
        })?;
        Ok(())
    }
}
