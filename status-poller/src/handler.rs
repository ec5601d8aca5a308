//! Callbacks a subscription reports to.
//!
//! Three shapes are provided:
//! - implement [`TransitionHandler`] directly
//! - build a [`CallbackHandler`] from closures
//! - forward everything as [`PollEvent`]s over a channel with [`ChannelHandler`]

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::types::ResourceId;

/// Receiver of a subscription's events.
///
/// Callbacks run on the polling task, one at a time, in tick order. A panic
/// inside a callback is caught and logged; it does not stop polling.
pub trait TransitionHandler<S>: Send + Sync {
    /// The observed state changed. `previous` is `None` on the first observation.
    fn on_transition(&self, resource_id: &ResourceId, previous: Option<&S>, state: &S);

    /// The resource no longer exists. Called at most once, after which the
    /// subscription is inactive.
    fn on_not_found(&self, resource_id: &ResourceId) {
        let _ = resource_id;
    }

    /// A fetch failed transiently. Polling continues on the next tick.
    fn on_error(&self, resource_id: &ResourceId, error: &FetchError) {
        let _ = (resource_id, error);
    }
}

impl<S, T> TransitionHandler<S> for Arc<T>
where
    T: TransitionHandler<S> + ?Sized,
{
    fn on_transition(&self, resource_id: &ResourceId, previous: Option<&S>, state: &S) {
        (**self).on_transition(resource_id, previous, state);
    }

    fn on_not_found(&self, resource_id: &ResourceId) {
        (**self).on_not_found(resource_id);
    }

    fn on_error(&self, resource_id: &ResourceId, error: &FetchError) {
        (**self).on_error(resource_id, error);
    }
}

type TransitionFn<S> = Box<dyn Fn(&ResourceId, Option<&S>, &S) + Send + Sync>;
type NotFoundFn = Box<dyn Fn(&ResourceId) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&ResourceId, &FetchError) + Send + Sync>;

/// Handler assembled from optional closures.
///
/// ```rust,ignore
/// let handler = CallbackHandler::new()
///     .on_transition(|id, _previous, status| println!("{id} is now {status:?}"))
///     .on_not_found(|id| println!("{id} disappeared"));
/// ```
pub struct CallbackHandler<S> {
    transition: Option<TransitionFn<S>>,
    not_found: Option<NotFoundFn>,
    error: Option<ErrorFn>,
}

impl<S> CallbackHandler<S> {
    /// Create a handler that ignores every event.
    pub fn new() -> Self {
        Self {
            transition: None,
            not_found: None,
            error: None,
        }
    }

    /// Set the transition callback.
    pub fn on_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceId, Option<&S>, &S) + Send + Sync + 'static,
    {
        self.transition = Some(Box::new(f));
        self
    }

    /// Set the not-found callback.
    pub fn on_not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceId) + Send + Sync + 'static,
    {
        self.not_found = Some(Box::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceId, &FetchError) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }
}

impl<S> Default for CallbackHandler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> TransitionHandler<S> for CallbackHandler<S> {
    fn on_transition(&self, resource_id: &ResourceId, previous: Option<&S>, state: &S) {
        if let Some(f) = &self.transition {
            f(resource_id, previous, state);
        }
    }

    fn on_not_found(&self, resource_id: &ResourceId) {
        if let Some(f) = &self.not_found {
            f(resource_id);
        }
    }

    fn on_error(&self, resource_id: &ResourceId, error: &FetchError) {
        if let Some(f) = &self.error {
            f(resource_id, error);
        }
    }
}

/// A subscription event as a value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PollEvent<S> {
    /// The observed state changed
    Transition {
        resource_id: ResourceId,
        previous: Option<S>,
        state: S,
    },
    /// The resource no longer exists
    NotFound { resource_id: ResourceId },
    /// A fetch failed; polling continues
    FetchFailed {
        resource_id: ResourceId,
        error: FetchError,
    },
}

impl<S> PollEvent<S> {
    /// The resource this event is about.
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            PollEvent::Transition { resource_id, .. }
            | PollEvent::NotFound { resource_id }
            | PollEvent::FetchFailed { resource_id, .. } => resource_id,
        }
    }
}

/// Handler forwarding every event to an unbounded channel.
///
/// Sends to a dropped receiver are ignored.
pub struct ChannelHandler<S> {
    sender: mpsc::UnboundedSender<PollEvent<S>>,
}

impl<S> ChannelHandler<S> {
    /// Create a handler and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PollEvent<S>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Create a handler sending into an existing channel.
    pub fn with_sender(sender: mpsc::UnboundedSender<PollEvent<S>>) -> Self {
        Self { sender }
    }

    fn send(&self, event: PollEvent<S>) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Poll event receiver dropped; event discarded");
        }
    }
}

impl<S: Clone + Send + Sync> TransitionHandler<S> for ChannelHandler<S> {
    fn on_transition(&self, resource_id: &ResourceId, previous: Option<&S>, state: &S) {
        self.send(PollEvent::Transition {
            resource_id: resource_id.clone(),
            previous: previous.cloned(),
            state: state.clone(),
        });
    }

    fn on_not_found(&self, resource_id: &ResourceId) {
        self.send(PollEvent::NotFound {
            resource_id: resource_id.clone(),
        });
    }

    fn on_error(&self, resource_id: &ResourceId, error: &FetchError) {
        self.send(PollEvent::FetchFailed {
            resource_id: resource_id.clone(),
            error: error.clone(),
        });
    }
}
