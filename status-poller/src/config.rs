//! Configuration types for the status-poller crate
//!
//! This module defines the configuration that controls a [`StatusPoller`](crate::StatusPoller):
//! the interval used when a caller does not pick one, and how many resources
//! may be tracked at once.

use std::time::Duration;

use crate::error::{PollerError, Result};

/// Configuration for the StatusPoller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval used by [`StatusPoller::options`](crate::StatusPoller::options)
    /// Default: 2 seconds
    pub default_interval: Duration,

    /// Maximum number of concurrently active subscriptions
    /// Default: 64
    pub max_subscriptions: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(2),
            max_subscriptions: 64,
        }
    }
}

impl PollerConfig {
    /// Create a new PollerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PollerConfig for snappy interactive tracking
    pub fn fast_polling() -> Self {
        Self {
            default_interval: Duration::from_millis(500),
            ..Default::default()
        }
    }

    /// Create a PollerConfig optimized for resource efficiency
    pub fn resource_efficient() -> Self {
        Self {
            default_interval: Duration::from_secs(10),
            max_subscriptions: 8,
        }
    }

    /// Set the default polling interval
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Set the subscription limit
    pub fn with_max_subscriptions(mut self, max: usize) -> Self {
        self.max_subscriptions = max;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_interval.is_zero() {
            return Err(PollerError::Configuration(
                "default_interval must be greater than zero".to_string(),
            ));
        }

        if self.max_subscriptions == 0 {
            return Err(PollerError::Configuration(
                "max_subscriptions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
