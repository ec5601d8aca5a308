//! Error types for the status-poller crate.

use crate::types::ResourceId;

/// Errors returned when starting or managing subscriptions.
///
/// Failures that happen while polling never surface here; they are reported
/// through the subscription's [`TransitionHandler`](crate::TransitionHandler).
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// The resource identifier was empty
    #[error("Resource identifier must not be empty")]
    EmptyResourceId,

    /// The polling interval was zero, or too long to schedule
    #[error("Polling interval must be greater than zero and schedulable")]
    InvalidInterval,

    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available to drive the polling loop")]
    NoRuntime,

    /// The poller already tracks its maximum number of resources
    #[error("Too many active subscriptions (limit: {limit})")]
    TooManySubscriptions {
        /// Configured subscription limit
        limit: usize,
    },

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Transient failure while fetching a resource's status.
///
/// Never terminal: the subscription stays active and the next tick fetches
/// again.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status that is not "not found"
    #[error("Unexpected response (HTTP {status}): {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Error message reported by the server, if any
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The fetcher panicked
    #[error("Fetcher panicked: {0}")]
    Panicked(String),

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// A caller-supplied callback panicked.
///
/// Isolated per invocation: logged, counted, and the loop carries on.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Callback `{callback}` panicked for {resource_id}: {message}")]
pub struct CallbackError {
    /// Resource whose callback failed
    pub resource_id: ResourceId,
    /// Name of the callback (`on_transition`, `on_not_found`, `on_error`)
    pub callback: &'static str,
    /// Panic payload, if it was a string
    pub message: String,
}

/// Convenience type alias for Results using PollerError.
pub type Result<T> = std::result::Result<T, PollerError>;

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
