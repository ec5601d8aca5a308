//! Polling task scheduler and management
//!
//! [`StatusPoller`] keeps one polling loop per resource identifier. Each loop
//! fetches immediately, then once per interval, reports state transitions
//! exactly once, and stops on cancellation, not-found, or a terminal state.

use dashmap::DashMap;
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::PollerConfig;
use crate::error::{panic_message, CallbackError, FetchError, PollerError, Result};
use crate::fetch::{FetchOutcome, StatusFetcher};
use crate::handler::TransitionHandler;
use crate::subscription::{PollSubscription, SubscriptionHandle, SubscriptionStats};
use crate::types::{PollState, RankFn, ResourceId, StopReason};

/// How a single subscription polls.
pub struct PollOptions<S> {
    interval: Duration,
    terminal_states: HashSet<S>,
    rank: Option<RankFn<S>>,
}

impl<S: PollState> PollOptions<S> {
    /// Poll every `interval` with no terminal states.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            terminal_states: HashSet::new(),
            rank: None,
        }
    }

    /// Stop polling once any of these states is observed.
    pub fn with_terminal_states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.terminal_states.extend(states);
        self
    }

    /// Only let the observed state move forward in `rank` order.
    ///
    /// States ranked below the last observed state are treated as stale reads
    /// and ignored.
    pub fn with_ordering<F>(mut self, rank: F) -> Self
    where
        F: Fn(&S) -> u32 + Send + Sync + 'static,
    {
        self.rank = Some(Arc::new(rank));
        self
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `state` ends the subscription.
    pub fn is_terminal(&self, state: &S) -> bool {
        self.terminal_states.contains(state)
    }
}

/// What the loop should do after handling one fetch.
enum Step {
    Continue,
    Stop,
}

/// Manages one polling loop per tracked resource.
///
/// Requires a tokio runtime; each subscription runs on its own task.
pub struct StatusPoller<S> {
    config: PollerConfig,
    subscriptions: DashMap<ResourceId, SubscriptionHandle<S>>,
}

impl<S: PollState> StatusPoller<S> {
    /// Create a poller with default configuration.
    pub fn new() -> Self {
        Self {
            config: PollerConfig::default(),
            subscriptions: DashMap::new(),
        }
    }

    /// Create a poller with a validated custom configuration.
    pub fn with_config(config: PollerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            subscriptions: DashMap::new(),
        })
    }

    /// The poller's configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Options preset with the configured default interval.
    pub fn options(&self) -> PollOptions<S> {
        PollOptions::new(self.config.default_interval)
    }

    /// Start tracking `resource_id`.
    ///
    /// Fetches immediately, then every `interval`. Each distinct new state is
    /// reported once through `handler`; polling stops after a state in
    /// `terminal_states`, after a not-found result, or on cancellation.
    ///
    /// If this poller already tracks `resource_id`, the previous subscription
    /// is cancelled first.
    pub fn start<F, H>(
        &self,
        resource_id: impl Into<ResourceId>,
        interval: Duration,
        terminal_states: impl IntoIterator<Item = S>,
        fetcher: F,
        handler: H,
    ) -> Result<SubscriptionHandle<S>>
    where
        F: StatusFetcher<S> + 'static,
        H: TransitionHandler<S> + 'static,
    {
        let options = PollOptions::new(interval).with_terminal_states(terminal_states);
        self.start_with(resource_id, options, fetcher, handler)
    }

    /// Start tracking `resource_id` with full [`PollOptions`].
    pub fn start_with<F, H>(
        &self,
        resource_id: impl Into<ResourceId>,
        options: PollOptions<S>,
        fetcher: F,
        handler: H,
    ) -> Result<SubscriptionHandle<S>>
    where
        F: StatusFetcher<S> + 'static,
        H: TransitionHandler<S> + 'static,
    {
        let resource_id = resource_id.into();
        if resource_id.is_blank() {
            return Err(PollerError::EmptyResourceId);
        }
        if !is_schedulable(options.interval) {
            return Err(PollerError::InvalidInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PollerError::NoRuntime)?;

        // One loop per resource: a restart replaces the old subscription
        if let Some((_, previous)) = self.subscriptions.remove(&resource_id) {
            if previous.cancel() {
                tracing::info!("Restarting polling for {}", resource_id);
            }
        }

        self.subscriptions.retain(|_, handle| handle.is_active());
        if self.subscriptions.len() >= self.config.max_subscriptions {
            return Err(PollerError::TooManySubscriptions {
                limit: self.config.max_subscriptions,
            });
        }

        let subscription = Arc::new(PollSubscription::new(resource_id.clone(), options.interval));
        let handle = SubscriptionHandle::new(Arc::clone(&subscription));

        tracing::info!(
            "Started polling for {} (interval: {:?})",
            resource_id,
            options.interval
        );

        runtime.spawn(polling_loop(subscription, options, fetcher, handler));
        self.subscriptions.insert(resource_id, handle.clone());

        Ok(handle)
    }

    /// Cancel a subscription through its handle.
    ///
    /// Equivalent to [`SubscriptionHandle::cancel`], and also forgets the
    /// resource in this poller's registry.
    pub fn cancel(&self, handle: &SubscriptionHandle<S>) -> bool {
        self.subscriptions
            .remove_if(handle.resource_id(), |_, tracked| tracked.same_subscription(handle));
        handle.cancel()
    }

    /// Cancel the subscription tracking `resource_id`, if any.
    pub fn stop(&self, resource_id: &ResourceId) -> bool {
        match self.subscriptions.remove(resource_id) {
            Some((_, handle)) => {
                let cancelled = handle.cancel();
                if cancelled {
                    tracing::info!("Stopped polling for {}", resource_id);
                }
                cancelled
            }
            None => false,
        }
    }

    /// Check if a resource is currently being polled.
    pub fn is_polling(&self, resource_id: &ResourceId) -> bool {
        self.subscriptions
            .get(resource_id)
            .map(|handle| handle.is_active())
            .unwrap_or(false)
    }

    /// Handle of the subscription tracking `resource_id`, if any.
    pub fn handle(&self, resource_id: &ResourceId) -> Option<SubscriptionHandle<S>> {
        self.subscriptions.get(resource_id).map(|entry| entry.value().clone())
    }

    /// Number of subscriptions still polling.
    pub fn active_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().is_active())
            .count()
    }

    /// Get statistics for every tracked subscription.
    pub fn stats(&self) -> PollerStats {
        let mut subscriptions: Vec<SubscriptionStats> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().stats())
            .collect();
        subscriptions.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

        PollerStats {
            active_subscriptions: subscriptions.iter().filter(|s| s.is_active).count(),
            max_subscriptions: self.config.max_subscriptions,
            default_interval: self.config.default_interval,
            subscriptions,
        }
    }

    /// Cancel every subscription and wait for their tasks to exit.
    pub async fn shutdown_all(&self) {
        let handles: Vec<SubscriptionHandle<S>> = self
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.subscriptions.clear();

        for handle in handles {
            handle.cancel();
            handle.finished().await;
            tracing::debug!("Polling task for {} shut down", handle.resource_id());
        }
    }
}

impl<S: PollState> Default for StatusPoller<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Main polling loop
async fn polling_loop<S, F, H>(
    subscription: Arc<PollSubscription<S>>,
    options: PollOptions<S>,
    fetcher: F,
    handler: H,
) where
    S: PollState,
    F: StatusFetcher<S>,
    H: TransitionHandler<S>,
{
    let _finish = FinishGuard(Arc::clone(&subscription));
    let resource_id = subscription.resource_id().clone();

    // The first tick completes immediately, giving the initial fetch
    let mut ticks = tokio::time::interval(options.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let tick = tokio::select! {
            biased;
            _ = subscription.wait_for_wake() => None,
            tick = ticks.tick() => Some(tick),
        };

        let Some(tick) = tick else { break };
        if !subscription.is_active() {
            break;
        }

        subscription.counters().fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Polling {}", resource_id);
        let fetch_started = Instant::now();

        let result = match AssertUnwindSafe(fetcher.fetch_status(&resource_id))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(FetchError::Panicked(panic_message(payload.as_ref()))),
        };

        let skipped = skipped_ticks(tick, fetch_started, Instant::now(), options.interval);
        if skipped > 0 {
            tracing::debug!(
                "Skipped {} tick(s) for {} while a fetch was in flight",
                skipped,
                resource_id
            );
            subscription
                .counters()
                .skipped_ticks
                .fetch_add(skipped, Ordering::Relaxed);
        }

        if !subscription.is_active() {
            tracing::debug!("Discarding fetch result for cancelled {}", resource_id);
            break;
        }

        let step = match result {
            Ok(FetchOutcome::Found(state)) => observe(&subscription, &options, &handler, state),
            Ok(FetchOutcome::NotFound) => {
                tracing::info!("{} not found; polling stopped", resource_id);
                if subscription.deactivate(StopReason::NotFound) {
                    invoke(&subscription, "on_not_found", || {
                        handler.on_not_found(&resource_id)
                    });
                }
                Step::Stop
            }
            Err(error) => {
                let errors = subscription.counters().errors.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    "Polling error for {} (error {}): {}",
                    resource_id,
                    errors,
                    error
                );
                dispatch(&subscription, "on_error", || {
                    handler.on_error(&resource_id, &error)
                });
                Step::Continue
            }
        };

        if matches!(step, Step::Stop) || !subscription.is_active() {
            break;
        }
    }

    tracing::debug!(
        "Polling task ended for {} ({})",
        resource_id,
        subscription
            .stop_reason()
            .map(|reason| reason.to_string())
            .unwrap_or_else(|| "stopped".to_string())
    );
}

/// Compare a fetched state against the last observed one and report it.
fn observe<S, H>(
    subscription: &PollSubscription<S>,
    options: &PollOptions<S>,
    handler: &H,
    state: S,
) -> Step
where
    S: PollState,
    H: TransitionHandler<S>,
{
    let resource_id = subscription.resource_id();
    let previous = subscription.last_observed_ref().read().clone();

    if let Some(previous) = &previous {
        if *previous == state {
            return Step::Continue;
        }
        if let Some(rank) = &options.rank {
            if rank(&state) < rank(previous) {
                tracing::debug!(
                    "Ignoring stale state {:?} for {} (already at {:?})",
                    state,
                    resource_id,
                    previous
                );
                return Step::Continue;
            }
        }
    }

    *subscription.last_observed_ref().write() = Some(state.clone());
    subscription.counters().transitions.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "State change detected for {}: {:?} -> {:?}",
        resource_id,
        previous,
        state
    );

    dispatch(subscription, "on_transition", || {
        handler.on_transition(resource_id, previous.as_ref(), &state)
    });

    if options.is_terminal(&state) {
        tracing::info!("{} reached terminal state {:?}", resource_id, state);
        subscription.deactivate(StopReason::Terminal);
        return Step::Stop;
    }

    Step::Continue
}

/// Invoke a callback only while the subscription is still active.
fn dispatch<S>(subscription: &PollSubscription<S>, callback: &'static str, f: impl FnOnce()) {
    if !subscription.is_active() {
        tracing::debug!(
            "Suppressed {} for inactive {}",
            callback,
            subscription.resource_id()
        );
        return;
    }
    invoke(subscription, callback, f);
}

/// Invoke a callback, containing any panic it raises.
fn invoke<S>(subscription: &PollSubscription<S>, callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        subscription
            .counters()
            .callback_failures
            .fetch_add(1, Ordering::Relaxed);
        let error = CallbackError {
            resource_id: subscription.resource_id().clone(),
            callback,
            message: panic_message(payload.as_ref()),
        };
        tracing::warn!("{}; polling continues", error);
    }
}

/// Whether ticks `interval` apart can be scheduled from now.
///
/// A late tick is rescheduled up to two periods past the current instant, so
/// that deadline must be representable.
fn is_schedulable(interval: Duration) -> bool {
    !interval.is_zero()
        && interval
            .checked_mul(2)
            .and_then(|ahead| Instant::now().checked_add(ahead))
            .is_some()
}

/// Ticks that elapsed between `started` and `finished` and will not be
/// delivered.
///
/// Deadlines sit on the grid `tick + k * interval`. With
/// [`MissedTickBehavior::Skip`] the first overdue deadline still fires as soon
/// as the fetch returns; every later one is dropped.
fn skipped_ticks(tick: Instant, started: Instant, finished: Instant, interval: Duration) -> u64 {
    let periods = |at: Instant| at.saturating_duration_since(tick).as_nanos() / interval.as_nanos();
    let overdue = periods(finished).saturating_sub(periods(started));
    u64::try_from(overdue.saturating_sub(1)).unwrap_or(u64::MAX)
}

/// Marks the subscription finished when the loop exits, however it exits.
struct FinishGuard<S>(Arc<PollSubscription<S>>);

impl<S> Drop for FinishGuard<S> {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// Statistics for the status poller
#[derive(Debug)]
pub struct PollerStats {
    pub active_subscriptions: usize,
    pub max_subscriptions: usize,
    pub default_interval: Duration,
    pub subscriptions: Vec<SubscriptionStats>,
}

impl std::fmt::Display for PollerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Status Poller Stats:")?;
        writeln!(
            f,
            "  Active subscriptions: {}/{}",
            self.active_subscriptions, self.max_subscriptions
        )?;
        writeln!(f, "  Default interval: {:?}", self.default_interval)?;

        if !self.subscriptions.is_empty() {
            writeln!(f, "  Subscriptions:")?;
            for stat in &self.subscriptions {
                let state = match stat.stop_reason {
                    Some(reason) => reason.to_string(),
                    None if stat.is_active => "active".to_string(),
                    None => "stopped".to_string(),
                };
                writeln!(
                    f,
                    "    {}: {} (interval: {:?}, fetches: {}, transitions: {}, errors: {})",
                    stat.resource_id,
                    state,
                    stat.interval,
                    stat.fetch_count,
                    stat.transition_count,
                    stat.error_count
                )?;
            }
        }

        Ok(())
    }
}
