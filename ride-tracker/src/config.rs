//! Configuration for the ride tracker
//!
//! Bundles the API client settings with the polling cadence for each kind of
//! tracked resource.

use ride_api::ApiConfig;
use status_poller::PollerConfig;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Configuration for [`RideTracker`](crate::RideTracker)
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Ride API client settings
    pub api: ApiConfig,

    /// Limits shared by every poller the tracker owns
    pub poller: PollerConfig,

    /// How often a ride is polled
    /// Default: 2 seconds
    pub ride_interval: Duration,

    /// How often a trip is polled
    /// Default: 3 seconds
    pub trip_interval: Duration,

    /// How often a pending payment is polled
    /// Default: 2 seconds
    pub payment_interval: Duration,

    /// How often the active-rides list is refreshed
    /// Default: 3 seconds
    pub active_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poller: PollerConfig::default(),
            ride_interval: Duration::from_secs(2),
            trip_interval: Duration::from_secs(3),
            payment_interval: Duration::from_secs(2),
            active_interval: Duration::from_secs(3),
        }
    }
}

impl TrackerConfig {
    /// Create a new TrackerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll every resource kind at the same interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.ride_interval = interval;
        self.trip_interval = interval;
        self.payment_interval = interval;
        self.active_interval = interval;
        self
    }

    /// Set the API client settings
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Set the poller limits
    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.poller.validate()?;

        for (name, interval) in [
            ("ride_interval", self.ride_interval),
            ("trip_interval", self.trip_interval),
            ("payment_interval", self.payment_interval),
            ("active_interval", self.active_interval),
        ] {
            if interval.is_zero() {
                return Err(TrackerError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
