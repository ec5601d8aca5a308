//! Configuration for the ride API client

use std::time::Duration;
use url::Url;

use crate::error::{ApiError, Result};

/// Base URL of a locally running ride API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

/// Configuration for [`RideApiClient`](crate::RideApiClient)
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Versioned API root, e.g. `http://localhost:8080/v1`
    /// Default: [`DEFAULT_BASE_URL`]
    pub base_url: String,

    /// Timeout for establishing a connection
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Timeout for a whole request, including reading the body
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Create a new ApiConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parse the base URL, normalised to end with a single `/` so relative
    /// endpoint paths join beneath it.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let invalid = |reason: String| ApiError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };

        let trimmed = self.base_url.trim().trim_end_matches('/');
        let url = Url::parse(&format!("{}/", trimmed)).map_err(|e| invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme '{}'", other))),
        }
        if url.cannot_be_a_base() || url.host().is_none() {
            return Err(invalid("URL has no host".to_string()));
        }

        Ok(url)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;

        if self.connect_timeout.is_zero() {
            return Err(ApiError::InvalidRequest(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ApiError::InvalidRequest(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
