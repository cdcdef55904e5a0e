use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    AppError, ErrorKind, DEFAULT_API_BASE_URL, DEFAULT_FULL_LIST_LIMIT, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};

pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("page size must be between 1 and {max}, got {value}")]
    InvalidPageSize { value: usize, max: usize },

    #[error("full list limit must be at least the page size")]
    InvalidFullListLimit,

    #[error("detail cache capacity must be greater than zero")]
    InvalidCacheCapacity,
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Runtime settings the shell may override with `Event::Configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub api_base_url: String,
    pub page_size: usize,
    pub full_list_limit: usize,
    /// Number of distinct details kept; id aliases are free. `None` keeps
    /// every fetched detail for the process lifetime.
    pub detail_cache_capacity: Option<usize>,
    pub persist_drafts: bool,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            full_list_limit: DEFAULT_FULL_LIST_LIMIT,
            detail_cache_capacity: None,
            persist_drafts: true,
        }
    }
}

impl ExplorerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ApiEndpoints::new(&self.api_base_url)?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize {
                value: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        if self.full_list_limit < self.page_size {
            return Err(ConfigError::InvalidFullListLimit);
        }
        if self.detail_cache_capacity == Some(0) {
            return Err(ConfigError::InvalidCacheCapacity);
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<ApiEndpoints, ConfigError> {
        ApiEndpoints::new(&self.api_base_url)
    }
}

/// Validated upstream base URL and the request URLs built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            url: truncate_url(base_url),
            reason: reason.to_string(),
        };

        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(invalid("URL is too long"));
        }

        let base = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(invalid("only 'http' and 'https' are allowed"));
        }
        if base.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }
        if !base.username().is_empty() || base.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base"));
        }

        Ok(Self { base })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    /// `{base}/pokemon?offset={offset}&limit={limit}`
    #[must_use]
    pub fn list(&self, offset: usize, limit: usize) -> String {
        let mut url = self.resource(&["pokemon"]);
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        url.to_string()
    }

    /// `{base}/pokemon/{key}`; the key is percent-encoded as a single segment.
    #[must_use]
    pub fn detail(&self, key: &str) -> String {
        self.resource(&["pokemon", key]).to_string()
    }

    fn resource(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() <= 100 {
        url.to_string()
    } else {
        format!("{}...", url.chars().take(100).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExplorerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.detail_cache_capacity, None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ExplorerConfig = serde_json::from_str(r#"{"page_size": 50}"#).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.persist_drafts);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_page = ExplorerConfig {
            page_size: 0,
            ..ExplorerConfig::default()
        };
        assert!(matches!(
            zero_page.validate(),
            Err(ConfigError::InvalidPageSize { value: 0, .. })
        ));

        let tiny_limit = ExplorerConfig {
            full_list_limit: 5,
            ..ExplorerConfig::default()
        };
        assert_eq!(tiny_limit.validate(), Err(ConfigError::InvalidFullListLimit));

        let zero_cache = ExplorerConfig {
            detail_cache_capacity: Some(0),
            ..ExplorerConfig::default()
        };
        assert_eq!(zero_cache.validate(), Err(ConfigError::InvalidCacheCapacity));
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        for url in ["", "   ", "ftp://pokeapi.co", "not a url", "https://user:pw@pokeapi.co"] {
            assert!(ApiEndpoints::new(url).is_err(), "accepted {url:?}");
        }
    }

    #[test]
    fn test_config_error_is_validation_kind() {
        let app: AppError = ConfigError::InvalidFullListLimit.into();
        assert_eq!(app.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_list_url() {
        let endpoints = ApiEndpoints::new("https://pokeapi.co/api/v2").unwrap();
        assert_eq!(
            endpoints.list(40, 20),
            "https://pokeapi.co/api/v2/pokemon?offset=40&limit=20"
        );
    }

    #[test]
    fn test_trailing_slash_base() {
        let endpoints = ApiEndpoints::new("https://pokeapi.co/api/v2/").unwrap();
        assert_eq!(endpoints.detail("25"), "https://pokeapi.co/api/v2/pokemon/25");
    }

    #[test]
    fn test_detail_key_is_single_segment() {
        let endpoints = ApiEndpoints::new("https://pokeapi.co/api/v2").unwrap();
        assert_eq!(
            endpoints.detail("mr/mime"),
            "https://pokeapi.co/api/v2/pokemon/mr%2Fmime"
        );
    }
}
