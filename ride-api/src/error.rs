use status_poller::FetchError;
use thiserror::Error;

/// Errors returned by the ride API client
///
/// Every non-success response is classified here. A 404 is kept apart from
/// the other HTTP failures because pollers treat it as "the resource is gone"
/// rather than as a transient failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 404 for the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status
    ///
    /// `message` is the server's `error` (or `message`) field when the body
    /// carries one, otherwise the status' canonical reason.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, timeout or transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The configured base URL cannot be used
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A request argument was rejected before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether this is a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convert a non-404 client error into the poller's transient failure type
///
/// `NotFound` never reaches this conversion in the fetchers; it becomes
/// `FetchOutcome::NotFound` instead.
impl From<ApiError> for FetchError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Network(msg) => FetchError::Network(msg),
            ApiError::Decode(msg) => FetchError::Decode(msg),
            ApiError::Http { status, message } => FetchError::UnexpectedStatus { status, message },
            ApiError::NotFound(what) => FetchError::UnexpectedStatus {
                status: 404,
                message: what,
            },
            other => FetchError::Other(other.to_string()),
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
