//! Service configuration loaded from the environment.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default image-capable Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-image-preview";
/// Default remove.bg API endpoint.
pub const DEFAULT_REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";

const GEMINI_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Connection settings for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: Option<String>,
    /// Model name, e.g. `gemini-3-pro-image-preview`.
    pub model: String,
    /// Scheme and host of the API, without a trailing slash.
    pub base_url: String,
    /// Whole-request timeout. Image generation at 4K can take minutes.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl GeminiConfig {
    /// Create a config with defaults and no API key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `GEMINI_API_KEY` (or `GOOGLE_API_KEY`), `GEMINI_MODEL` and
    /// `GEMINI_BASE_URL` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = GEMINI_KEY_VARS
            .iter()
            .find_map(|name| lookup(*name).filter(|v| !v.is_empty()));
        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.is_empty()) {
            config.model = model;
        }
        if let Some(url) = lookup("GEMINI_BASE_URL").filter(|v| !v.is_empty()) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return the API key or a [`Error::MissingApiKey`] naming the variable to set.
    ///
    /// # Errors
    ///
    /// Fails when no key was configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(Error::MissingApiKey(GEMINI_KEY_VARS[0]))
    }

    /// Full `generateContent` URL for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Connection settings for the remove.bg HTTP API.
#[derive(Debug, Clone)]
pub struct RemoveBgConfig {
    /// API key sent as `X-Api-Key`.
    pub api_key: Option<String>,
    /// Full endpoint URL.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_REMOVE_BG_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RemoveBgConfig {
    /// Read `REMOVE_BG_API_KEY` and `REMOVE_BG_URL` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            api_key: lookup("REMOVE_BG_API_KEY").filter(|v| !v.is_empty()),
            ..Self::default()
        };
        if let Some(url) = lookup("REMOVE_BG_URL").filter(|v| !v.is_empty()) {
            config.url = url;
        }
        config
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Return the API key or a [`Error::MissingApiKey`].
    ///
    /// # Errors
    ///
    /// Fails when no key was configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(Error::MissingApiKey("REMOVE_BG_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn gemini_defaults_without_environment() {
        let config = GeminiConfig::from_vars(vars(&[]));
        assert!(config.api_key.is_none());
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert!(matches!(
            config.require_api_key(),
            Err(Error::MissingApiKey("GEMINI_API_KEY"))
        ));
    }

    #[test]
    fn gemini_key_prefers_gemini_over_google() {
        let config = GeminiConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", "g1"),
            ("GOOGLE_API_KEY", "g2"),
        ]));
        assert_eq!(config.require_api_key().unwrap(), "g1");

        let config = GeminiConfig::from_vars(vars(&[("GOOGLE_API_KEY", "g2")]));
        assert_eq!(config.require_api_key().unwrap(), "g2");

        let config = GeminiConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", ""),
            ("GOOGLE_API_KEY", "g2"),
        ]));
        assert_eq!(config.require_api_key().unwrap(), "g2");
    }

    #[test]
    fn gemini_endpoint_uses_model_and_trims_slash() {
        let config = GeminiConfig::new()
            .with_base_url("http://localhost:9000/")
            .with_model("test-model");
        assert_eq!(
            config.endpoint(),
            "http://localhost:9000/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn remove_bg_reads_key_and_url() {
        let config = RemoveBgConfig::from_vars(vars(&[
            ("REMOVE_BG_API_KEY", "rb"),
            ("REMOVE_BG_URL", "http://localhost/removebg"),
        ]));
        assert_eq!(config.require_api_key().unwrap(), "rb");
        assert_eq!(config.url, "http://localhost/removebg");

        let config = RemoveBgConfig::from_vars(vars(&[]));
        assert!(config.require_api_key().is_err());
        assert_eq!(config.url, DEFAULT_REMOVE_BG_URL);
    }
}
