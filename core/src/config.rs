//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;
use crate::rate_limit::{PacingPolicy, DEFAULT_INITIAL_REMAINING};

/// Largest page the upstream serves.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Items per page for collection listings.
pub const DEFAULT_PAGE_SIZE: u64 = MAX_PAGE_SIZE;

pub const ENV_BASE_URL: &str = "CMS_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "CMS_API_TOKEN";
pub const ENV_PAGE_SIZE: &str = "CMS_PAGE_SIZE";

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub page_size: u64,
    pub initial_remaining: u64,
    pub pacing: PacingPolicy,
}

// Keeps the token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("initial_remaining", &self.initial_remaining)
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            initial_remaining: DEFAULT_INITIAL_REMAINING,
            pacing: PacingPolicy::default(),
        }
    }

    /// Read `CMS_API_BASE_URL`, `CMS_API_TOKEN` and optionally `CMS_PAGE_SIZE`.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = require_env(ENV_BASE_URL)?;
        let api_token = require_env(ENV_API_TOKEN)?;
        let mut config = Self::new(base_url, api_token);
        if let Ok(raw) = std::env::var(ENV_PAGE_SIZE) {
            config.page_size = raw.trim().parse().map_err(|_| {
                ApiError::InvalidConfig(format!("{ENV_PAGE_SIZE} is not a number: {raw}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_initial_remaining(mut self, remaining: u64) -> Self {
        self.initial_remaining = remaining;
        self
    }

    pub fn with_low_water_mark(mut self, low_water_mark: u64) -> Self {
        self.pacing.low_water_mark = low_water_mark;
        self
    }

    pub fn with_pacing_unit(mut self, unit: Duration) -> Self {
        self.pacing.unit = unit;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.api_token.trim().is_empty() {
            return Err(ApiError::InvalidConfig("api_token is empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ApiError::InvalidConfig(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.pacing.unit.is_zero() {
            return Err(ApiError::InvalidConfig("pacing unit must be positive".to_string()));
        }
        Ok(())
    }
}

fn require_env(name: &str) -> Result<String, ApiError> {
    std::env::var(name).map_err(|_| ApiError::InvalidConfig(format!("{name} is not set")))
}
