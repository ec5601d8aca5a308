use ride_api::ApiError;
use status_poller::PollerError;
use thiserror::Error;

/// Errors raised by the ride tracker
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A request to the ride API failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A polling subscription could not be started
    #[error("Polling error: {0}")]
    Poller(#[from] PollerError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Type alias for results that can return a TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;
