use std::time::Duration;

use url::Url;

use crate::api::{ApiClient, ApiConfig};
use crate::error::Error;
use crate::profile_cache::DEFAULT_PROFILE_KEY;
use crate::token_store::DEFAULT_TOKEN_KEY;

/// Session manager configuration.
///
/// The identity API client is a constructor parameter. Use
/// [`from_env()`](SessionConfig::from_env) for convention-based setup, or
/// [`new()`](SessionConfig::new) with `with_*` methods for full control.
pub struct SessionConfig {
    pub(super) api: ApiClient,
    pub(super) token_key: String,
    pub(super) profile_key: String,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            token_key: DEFAULT_TOKEN_KEY.into(),
            profile_key: DEFAULT_PROFILE_KEY.into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `DISASTERCONNECT_API_URL`: identity API base URL
    ///
    /// # Optional env vars
    /// - `DISASTERCONNECT_TOKEN_KEY`: storage key for the bearer token (default `token`)
    /// - `DISASTERCONNECT_PROFILE_KEY`: storage key for the profile (default `user`)
    /// - `DISASTERCONNECT_TIMEOUT_SECS`: per-request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or invalid, or the
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("DISASTERCONNECT_API_URL")
            .map_err(|_| Error::Config("DISASTERCONNECT_API_URL is required".into()))?;
        let base_url: Url = base_url
            .parse()
            .map_err(|e| Error::Config(format!("DISASTERCONNECT_API_URL: {e}")))?;

        let mut api = ApiConfig::new(base_url);
        if let Ok(secs) = std::env::var("DISASTERCONNECT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "DISASTERCONNECT_TIMEOUT_SECS must be a positive integer, got {secs:?}"
                    ))
                })?;
            api = api.with_timeout(Duration::from_secs(secs));
        }

        let mut config = Self::new(ApiClient::new(api));
        if let Ok(key) = std::env::var("DISASTERCONNECT_TOKEN_KEY") {
            config = config.with_token_key(key);
        }
        if let Ok(key) = std::env::var("DISASTERCONNECT_PROFILE_KEY") {
            config = config.with_profile_key(key);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    #[must_use]
    pub fn with_profile_key(mut self, key: impl Into<String>) -> Self {
        self.profile_key = key.into();
        self
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_standard_keys() {
        let config = SessionConfig::new(ApiClient::new(ApiConfig::new(
            "http://localhost:5000/api".parse().unwrap(),
        )));
        assert_eq!(config.token_key, "token");
        assert_eq!(config.profile_key, "user");
        assert_eq!(
            config.api().config().base_url().as_str(),
            "http://localhost:5000/api/"
        );
    }

    #[test]
    fn key_overrides() {
        let config = SessionConfig::new(ApiClient::new(ApiConfig::new(
            "http://localhost:5000/".parse().unwrap(),
        )))
        .with_token_key("dc_token")
        .with_profile_key("dc_user");
        assert_eq!(config.token_key, "dc_token");
        assert_eq!(config.profile_key, "dc_user");
    }
}
