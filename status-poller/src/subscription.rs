//! Per-resource subscription state and the caller-facing handle.
//!
//! Each [`PollSubscription`] is owned by exactly one polling task. The caller
//! only ever sees it through a [`SubscriptionHandle`], which can cancel it and
//! read its progress. Nothing is shared between subscriptions.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Notify};

use crate::types::{ResourceId, StopReason};

/// Live tracking context for one resource identifier.
#[derive(Debug)]
pub struct PollSubscription<S> {
    resource_id: ResourceId,
    interval: Duration,
    active: AtomicBool,
    last_observed: RwLock<Option<S>>,
    stop_reason: Mutex<Option<StopReason>>,
    /// Wakes the loop out of its tick wait on cancellation
    wake: Notify,
    finished: watch::Sender<bool>,
    started_at: SystemTime,
    counters: Counters,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) fetches: AtomicU64,
    pub(crate) transitions: AtomicU64,
    pub(crate) errors: AtomicU64,
    pub(crate) callback_failures: AtomicU64,
    pub(crate) skipped_ticks: AtomicU64,
}

impl<S> PollSubscription<S> {
    pub(crate) fn new(resource_id: ResourceId, interval: Duration) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            resource_id,
            interval,
            active: AtomicBool::new(true),
            last_observed: RwLock::new(None),
            stop_reason: Mutex::new(None),
            wake: Notify::new(),
            finished,
            started_at: SystemTime::now(),
            counters: Counters::default(),
        }
    }

    /// The tracked resource.
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Fixed polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the subscription still polls and reports.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Why the subscription stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        *self.stop_reason.lock()
    }

    /// Deactivate, recording `reason`. Returns `true` only for the call that
    /// actually flipped the subscription from active to inactive.
    pub(crate) fn deactivate(&self, reason: StopReason) -> bool {
        let mut stop_reason = self.stop_reason.lock();
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        *stop_reason = Some(reason);
        drop(stop_reason);
        self.wake.notify_one();
        true
    }

    pub(crate) async fn wait_for_wake(&self) {
        self.wake.notified().await;
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.send_replace(true);
    }

    pub(crate) fn last_observed_ref(&self) -> &RwLock<Option<S>> {
        &self.last_observed
    }

    /// Snapshot of the subscription's progress.
    pub fn stats(&self) -> SubscriptionStats {
        SubscriptionStats {
            resource_id: self.resource_id.clone(),
            interval: self.interval,
            started_at: self.started_at,
            is_active: self.is_active(),
            stop_reason: self.stop_reason(),
            fetch_count: self.counters.fetches.load(Ordering::Relaxed),
            transition_count: self.counters.transitions.load(Ordering::Relaxed),
            error_count: self.counters.errors.load(Ordering::Relaxed),
            callback_failures: self.counters.callback_failures.load(Ordering::Relaxed),
            skipped_ticks: self.counters.skipped_ticks.load(Ordering::Relaxed),
        }
    }
}

impl<S: Clone> PollSubscription<S> {
    /// The most recent state successfully fetched, if any.
    pub fn last_observed(&self) -> Option<S> {
        self.last_observed.read().clone()
    }
}

/// Statistics for a single subscription
#[derive(Debug, Clone)]
pub struct SubscriptionStats {
    pub resource_id: ResourceId,
    pub interval: Duration,
    pub started_at: SystemTime,
    pub is_active: bool,
    pub stop_reason: Option<StopReason>,
    pub fetch_count: u64,
    pub transition_count: u64,
    pub error_count: u64,
    pub callback_failures: u64,
    pub skipped_ticks: u64,
}

/// Caller-side handle to a running subscription.
///
/// Cheap to clone; all clones refer to the same subscription. Dropping every
/// handle does not stop polling; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct SubscriptionHandle<S> {
    subscription: Arc<PollSubscription<S>>,
}

impl<S> Clone for SubscriptionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            subscription: Arc::clone(&self.subscription),
        }
    }
}

impl<S> SubscriptionHandle<S> {
    pub(crate) fn new(subscription: Arc<PollSubscription<S>>) -> Self {
        Self { subscription }
    }

    /// Stop polling.
    ///
    /// Once this returns no further fetch is started. A fetch already in
    /// flight may still complete, but its result is discarded and no callback
    /// fires. Returns `false` if the subscription had already stopped.
    pub fn cancel(&self) -> bool {
        let cancelled = self.subscription.deactivate(StopReason::Cancelled);
        if cancelled {
            tracing::debug!("Cancelled polling for {}", self.subscription.resource_id());
        }
        cancelled
    }

    /// The tracked resource.
    pub fn resource_id(&self) -> &ResourceId {
        self.subscription.resource_id()
    }

    /// Whether both handles refer to the same subscription.
    pub fn same_subscription(&self, other: &SubscriptionHandle<S>) -> bool {
        Arc::ptr_eq(&self.subscription, &other.subscription)
    }

    /// Fixed polling interval.
    pub fn interval(&self) -> Duration {
        self.subscription.interval()
    }

    /// Whether the subscription still polls and reports.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Why the subscription stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.subscription.stop_reason()
    }

    /// Snapshot of the subscription's progress.
    pub fn stats(&self) -> SubscriptionStats {
        self.subscription.stats()
    }

    /// Wait until the polling task has exited.
    ///
    /// Resolves immediately if it already has.
    pub async fn finished(&self) {
        let mut rx = self.subscription.finished.subscribe();
        // The sender lives inside the subscription we hold, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Whether the polling task has exited.
    pub fn is_finished(&self) -> bool {
        *self.subscription.finished.borrow()
    }
}

impl<S: Clone> SubscriptionHandle<S> {
    /// The most recent state successfully fetched, if any.
    pub fn last_observed(&self) -> Option<S> {
        self.subscription.last_observed()
    }
}
