use std::{collections::HashMap, path::PathBuf, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    types::{DEFAULT_RESULT_LIMIT, MAX_RESULT_LIMIT, MIN_RESULT_LIMIT},
};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const ENV_PREFIX: &str = "VIDSEEK";

/// How the search endpoint expects its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// `GET /search?query=...&top_k=...`
    #[default]
    Get,
    /// `POST /search` with a JSON body
    Post,
}

/// Client settings. Every field has a default, so an empty config is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target host+port (and optional path prefix) for all API calls
    pub api_base_url: String,

    /// Timeout for search, health, fetch and delete calls, in seconds
    pub short_timeout_secs: u64,

    /// Timeout for upload and summarize calls, in seconds
    pub long_timeout_secs: u64,

    pub connect_timeout_secs: u64,

    pub search_method: SearchMethod,

    /// Path of the CSV ingestion endpoint (`/ingest` or `/upload_csv`)
    pub upload_path: String,

    pub default_result_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            short_timeout_secs: 30,
            long_timeout_secs: 120,
            connect_timeout_secs: 10,
            search_method: SearchMethod::Get,
            upload_path: "/ingest".to_string(),
            default_result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Load from the user config file and the process environment.
    ///
    /// Later sources win: defaults, config file, `VIDSEEK_*` variables,
    /// then `API_BASE_URL`.
    pub fn load(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let file = file.or_else(default_config_path);
        Self::load_from(file, None)
    }

    /// Same as [`ClientConfig::load`] but with an explicit environment map
    /// instead of the process environment.
    pub fn load_from(
        file: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let base_url_override = match &env {
            Some(vars) => vars.get(API_BASE_URL_ENV).cloned(),
            None => std::env::var(API_BASE_URL_ENV).ok(),
        };

        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        if let Some(url) = base_url_override.filter(|u| !u.trim().is_empty()) {
            builder = builder.set_override("api_base_url", url)?;
        }

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_base_url = url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.short_timeout_secs == 0 || self.long_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "timeouts must be greater than zero".to_string(),
            });
        }
        if !(MIN_RESULT_LIMIT..=MAX_RESULT_LIMIT).contains(&self.default_result_limit) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "default_result_limit must be between {} and {}",
                    MIN_RESULT_LIMIT, MAX_RESULT_LIMIT
                ),
            });
        }
        if self.upload_path.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid {
                reason: "upload_path cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.api_base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                reason: "expected an http or https URL".to_string(),
            });
        }
        Ok(url)
    }

    pub fn short_timeout(&self) -> Duration {
        Duration::from_secs(self.short_timeout_secs)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// `~/.config/vidseek/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vidseek").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_without_sources() {
        let config = ClientConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.short_timeout(), Duration::from_secs(30));
        assert_eq!(config.long_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn api_base_url_variable_wins() {
        let config = ClientConfig::load_from(
            None,
            env(&[
                ("VIDSEEK_API_BASE_URL", "http://10.0.0.1:9000"),
                ("API_BASE_URL", "http://search.internal:8000/api"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api_base_url, "http://search.internal:8000/api");
    }

    #[test]
    fn prefixed_variables_are_parsed() {
        let config = ClientConfig::load_from(
            None,
            env(&[
                ("VIDSEEK_SHORT_TIMEOUT_SECS", "5"),
                ("VIDSEEK_SEARCH_METHOD", "post"),
                ("VIDSEEK_UPLOAD_PATH", "/upload_csv"),
            ]),
        )
        .unwrap();
        assert_eq!(config.short_timeout_secs, 5);
        assert_eq!(config.search_method, SearchMethod::Post);
        assert_eq!(config.upload_path, "/upload_csv");
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"https://videos.example.com\"\nlong_timeout_secs = 300\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(Some(path), env(&[])).unwrap();
        assert_eq!(config.api_base_url, "https://videos.example.com");
        assert_eq!(config.long_timeout_secs, 300);
        assert_eq!(config.short_timeout_secs, 30);
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = ClientConfig::load_from(None, env(&[("API_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = ClientConfig::default()
            .with_base_url("ftp://files.example.com")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_out_of_range_default_limit() {
        let err = ClientConfig::load_from(None, env(&[("VIDSEEK_DEFAULT_RESULT_LIMIT", "50")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
