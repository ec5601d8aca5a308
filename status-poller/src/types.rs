//! Core types for the status-poller crate.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Opaque identifier of a remote resource being tracked (a ride id, a trip id, ...).
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Create a new resource ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the resource ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        id.clone()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bound for any status value the poller can track.
///
/// Blanket-implemented, so plain enums deriving `Clone, Debug, Eq, Hash` qualify.
pub trait PollState: Clone + Debug + Eq + Hash + Send + Sync + 'static {}

impl<T> PollState for T where T: Clone + Debug + Eq + Hash + Send + Sync + 'static {}

/// Lifecycle ranking used to reject stale states.
///
/// A fetched state whose rank is lower than the last observed state's rank is
/// ignored, so `last_observed` only moves forward.
pub type RankFn<S> = Arc<dyn Fn(&S) -> u32 + Send + Sync>;

/// Why a subscription stopped polling.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StopReason {
    /// The caller cancelled the subscription
    Cancelled,
    /// A terminal state was observed
    Terminal,
    /// The remote resource no longer exists
    NotFound,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StopReason::Cancelled => "cancelled",
            StopReason::Terminal => "terminal state reached",
            StopReason::NotFound => "resource not found",
        };
        f.write_str(label)
    }
}
