//! Client configuration: API key, base URLs and request tuning.

use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_STORE_BASE_URL: &str = "https://store.steampowered.com";
pub const DEFAULT_WEB_API_BASE_URL: &str = "https://api.steampowered.com";
pub const DEFAULT_MEDIA_BASE_URL: &str = "https://media.steampowered.com";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_PAGE_SIZE: usize = 100;

/// Inputs required by the remote client and the aggregators built on it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub store_base_url: String,
    pub web_api_base_url: String,
    pub media_base_url: String,
    pub language: String,
    pub country_code: String,
    pub timeout: Duration,
    /// Upper bound on per-item lookups in flight at once.
    pub max_concurrency: usize,
    pub page_size: usize,
}

impl ClientConfig {
    /// Creates a config with the public Steam endpoints and default tuning.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            store_base_url: DEFAULT_STORE_BASE_URL.to_string(),
            web_api_base_url: DEFAULT_WEB_API_BASE_URL.to_string(),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            language: "english".to_string(),
            country_code: "US".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Reads the config from the process environment.
    ///
    /// `STEAM_API_KEY` is required; every other variable falls back to the
    /// defaults of [`ClientConfig::new`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = lookup("STEAM_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("STEAM_API_KEY is required".to_string()))?;

        let mut config = Self::new(api_key.trim());
        if let Some(v) = lookup("STEAMCHECK_STORE_BASE_URL") {
            config.store_base_url = v;
        }
        if let Some(v) = lookup("STEAMCHECK_API_BASE_URL") {
            config.web_api_base_url = v;
        }
        if let Some(v) = lookup("STEAMCHECK_MEDIA_BASE_URL") {
            config.media_base_url = v;
        }
        if let Some(v) = lookup("STEAMCHECK_LANGUAGE") {
            config.language = v;
        }
        if let Some(v) = lookup("STEAMCHECK_COUNTRY") {
            config.country_code = v;
        }
        if let Some(v) = lookup("STEAMCHECK_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("STEAMCHECK_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("STEAMCHECK_MAX_CONCURRENCY") {
            config.max_concurrency = parse_number("STEAMCHECK_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("STEAMCHECK_PAGE_SIZE") {
            config.page_size = parse_number("STEAMCHECK_PAGE_SIZE", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_store_base_url(mut self, url: impl Into<String>) -> Self {
        self.store_base_url = url.into();
        self
    }

    pub fn with_web_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.web_api_base_url = url.into();
        self
    }

    pub fn with_media_base_url(mut self, url: impl Into<String>) -> Self {
        self.media_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Rejects values the aggregators cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config("api key must not be empty".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Config(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(AppError::Config("page size must be at least 1".to_string()));
        }
        for (name, url) in [
            ("store base url", &self.store_base_url),
            ("web api base url", &self.web_api_base_url),
            ("media base url", &self.media_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(AppError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Config(format!("{name} must be a number, got '{raw}'")))
}
