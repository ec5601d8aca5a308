//! The fetch capability a subscription polls through.
//!
//! A [`StatusFetcher`] answers one question: what is the current state of this
//! resource? It knows nothing about ticks, de-duplication or cancellation.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::error::FetchError;
use crate::types::ResourceId;

/// Result of a single successful fetch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FetchOutcome<S> {
    /// The resource exists and is in this state
    Found(S),
    /// The resource is gone; the subscription ends
    NotFound,
}

/// What a fetcher returns for one tick.
pub type FetchResult<S> = std::result::Result<FetchOutcome<S>, FetchError>;

/// Capability that looks up a resource's current state.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the polling loop runs on a tokio
/// task and may be moved between worker threads.
#[async_trait]
pub trait StatusFetcher<S>: Send + Sync {
    /// Fetch the current state of `resource_id`.
    ///
    /// Return `Ok(FetchOutcome::NotFound)` when the resource is confirmed gone
    /// and `Err(_)` for anything transient.
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<S>;
}

#[async_trait]
impl<S, T> StatusFetcher<S> for Arc<T>
where
    S: Send + 'static,
    T: StatusFetcher<S> + ?Sized,
{
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<S> {
        (**self).fetch_status(resource_id).await
    }
}

/// Adapter turning an async closure into a [`StatusFetcher`].
///
/// Built with [`fetch_fn`].
pub struct FnFetcher<F> {
    f: F,
}

/// Wrap an async closure as a fetcher.
///
/// ```rust,ignore
/// let fetcher = fetch_fn(|id: ResourceId| async move {
///     Ok::<_, FetchError>(FetchOutcome::Found(format!("status of {id}")))
/// });
/// ```
pub fn fetch_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<S, F, Fut> StatusFetcher<S> for FnFetcher<F>
where
    S: Send + 'static,
    F: Fn(ResourceId) -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult<S>> + Send,
{
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<S> {
        (self.f)(resource_id.clone()).await
    }
}
