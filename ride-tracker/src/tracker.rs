//! Ride tracking orchestration.
//!
//! [`RideTracker`] owns one [`StatusPoller`] per resource kind and turns their
//! callbacks into [`TrackerEvent`]s on a single channel. Following a ride also
//! follows its trip as soon as the ride reports one.

use chrono::{DateTime, Utc};
use ride_api::{
    ActiveRidesFetcher, Payment, PaymentRequest, PaymentStatus, PaymentStatusFetcher, Ride,
    RideApiClient, RideRequest, RideStatus, RideStatusFetcher, Trip, TripStatus, TripStatusFetcher,
};
use status_poller::{
    FetchError, PollOptions, PollState, ResourceId, StatusPoller, SubscriptionHandle,
    TransitionHandler,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::events::{TrackedResource, TrackerEvent};
use crate::recording::{Latest, Recording};

/// Subscription label for the active-rides list.
const ACTIVE_RIDES_ID: &str = "active";

/// Idempotency key for paying `trip_id` at `at`: `payment-{tripId}-{unixMillis}`.
pub fn payment_idempotency_key(trip_id: i64, at: DateTime<Utc>) -> String {
    format!("payment-{}-{}", trip_id, at.timestamp_millis())
}

/// Idempotency key for a ride requested at `at`: `ride-{unixMillis}`.
pub fn ride_idempotency_key(at: DateTime<Utc>) -> String {
    format!("ride-{}", at.timestamp_millis())
}

/// Tracks rides, trips and payments, reporting changes as [`TrackerEvent`]s.
///
/// ```rust,ignore
/// let (tracker, mut events) = RideTracker::new(TrackerConfig::default())?;
/// tracker.track_ride("RIDE-1A2B")?;
/// while let Some(event) = events.recv().await {
///     println!("{event}");
/// }
/// ```
#[derive(Clone)]
pub struct RideTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    client: RideApiClient,
    config: TrackerConfig,
    rides: StatusPoller<RideStatus>,
    trips: StatusPoller<TripStatus>,
    payments: StatusPoller<PaymentStatus>,
    active: StatusPoller<Vec<Ride>>,
    events: mpsc::UnboundedSender<TrackerEvent>,
}

impl RideTracker {
    /// Create a tracker and the receiving end of its event channel.
    pub fn new(config: TrackerConfig) -> Result<(Self, mpsc::UnboundedReceiver<TrackerEvent>)> {
        config.validate()?;
        let client = RideApiClient::new(config.api.clone())?;
        Self::with_client(client, config)
    }

    /// Create a tracker around an existing client.
    pub fn with_client(
        client: RideApiClient,
        config: TrackerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TrackerEvent>)> {
        config.validate()?;
        let (events, receiver) = mpsc::unbounded_channel();

        let inner = TrackerInner {
            rides: StatusPoller::with_config(config.poller.clone())?,
            trips: StatusPoller::with_config(config.poller.clone())?,
            payments: StatusPoller::with_config(config.poller.clone())?,
            active: StatusPoller::with_config(config.poller.clone())?,
            client,
            config,
            events,
        };

        Ok((
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        ))
    }

    /// The API client used for every request.
    pub fn client(&self) -> &RideApiClient {
        &self.inner.client
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Follow a ride until it completes, is cancelled, expires or disappears.
    ///
    /// Tracking the same ride again replaces the earlier subscription.
    pub fn track_ride(&self, ride_id: &str) -> Result<SubscriptionHandle<RideStatus>> {
        self.inner.track_ride(ride_id)
    }

    /// Follow a trip until it completes or disappears.
    pub fn track_trip(&self, trip_id: i64) -> Result<SubscriptionHandle<TripStatus>> {
        self.inner.track_trip(trip_id)
    }

    /// Follow a payment until it succeeds or fails.
    pub fn track_payment(&self, payment_id: &str) -> Result<SubscriptionHandle<PaymentStatus>> {
        self.inner.track_payment(payment_id)
    }

    /// Refresh the list of active rides every `active_interval` until stopped.
    ///
    /// The list is reported whenever it differs from the previous refresh.
    pub fn watch_active_rides(&self) -> Result<SubscriptionHandle<Vec<Ride>>> {
        self.inner.watch_active_rides()
    }

    /// Request a ride and start tracking it.
    ///
    /// An idempotency key is generated when the request has none.
    pub async fn request_ride(&self, mut request: RideRequest) -> Result<Ride> {
        if request.idempotency_key.is_none() {
            request.idempotency_key = Some(ride_idempotency_key(Utc::now()));
        }

        let ride = self.inner.client.create_ride(&request).await?;
        tracing::info!("Ride {} created with status {}", ride.ride_id, ride.status);
        self.inner.track_ride(&ride.ride_id)?;
        Ok(ride)
    }

    /// Pay for a trip, following the payment while it is still processing.
    pub async fn pay(&self, trip_id: i64) -> Result<Payment> {
        let request =
            PaymentRequest::new(trip_id).with_idempotency_key(payment_idempotency_key(trip_id, Utc::now()));
        let payment = self.inner.client.process_payment(&request).await?;
        tracing::info!(
            "Payment {} for trip {} is {}",
            payment.payment_id,
            trip_id,
            payment.status
        );

        if payment.status.is_terminal() {
            self.inner.emit(payment_event(&payment));
        } else {
            self.inner.track_payment(&payment.payment_id)?;
        }

        Ok(payment)
    }

    /// Stop following one ride. Its trip, if already followed, keeps going.
    pub fn stop_ride(&self, ride_id: &str) -> bool {
        self.inner.rides.stop(&ResourceId::new(ride_id.trim()))
    }

    /// Number of resources still being polled.
    pub fn active_count(&self) -> usize {
        self.inner.rides.active_count()
            + self.inner.trips.active_count()
            + self.inner.payments.active_count()
            + self.inner.active.active_count()
    }

    /// Cancel all tracking and wait for every polling task to exit.
    pub async fn stop(&self) {
        self.inner.rides.shutdown_all().await;
        self.inner.trips.shutdown_all().await;
        self.inner.payments.shutdown_all().await;
        self.inner.active.shutdown_all().await;
        tracing::info!("Ride tracker stopped");
    }
}

impl TrackerInner {
    fn track_ride(self: &Arc<Self>, ride_id: &str) -> Result<SubscriptionHandle<RideStatus>> {
        let ride_id = ride_id.trim();
        let (fetcher, latest) = Recording::new(RideStatusFetcher::new(self.client.clone()));
        let options = PollOptions::new(self.config.ride_interval)
            .with_terminal_states(RideStatus::TERMINAL)
            .with_ordering(RideStatus::lifecycle_rank);

        let resource = TrackedResource::Ride(ride_id.to_string());
        let handler = Forwarder::new(resource.clone(), latest, Arc::clone(self));
        let handle = self.rides.start_with(ride_id, options, fetcher, handler)?;

        tracing::info!("Tracking {}", resource);
        self.report_finish(handle.clone(), resource);
        Ok(handle)
    }

    fn track_trip(self: &Arc<Self>, trip_id: i64) -> Result<SubscriptionHandle<TripStatus>> {
        let (fetcher, latest) = Recording::new(TripStatusFetcher::new(self.client.clone()));
        let options = PollOptions::new(self.config.trip_interval)
            .with_terminal_states(TripStatus::TERMINAL);

        let resource = TrackedResource::Trip(trip_id);
        let handler = Forwarder::new(resource.clone(), latest, Arc::clone(self));
        let handle = self
            .trips
            .start_with(trip_id.to_string(), options, fetcher, handler)?;

        tracing::info!("Tracking {}", resource);
        self.report_finish(handle.clone(), resource);
        Ok(handle)
    }

    fn track_payment(self: &Arc<Self>, payment_id: &str) -> Result<SubscriptionHandle<PaymentStatus>> {
        let payment_id = payment_id.trim();
        let (fetcher, latest) = Recording::new(PaymentStatusFetcher::new(self.client.clone()));
        let options = PollOptions::new(self.config.payment_interval)
            .with_terminal_states(PaymentStatus::TERMINAL);

        let resource = TrackedResource::Payment(payment_id.to_string());
        let handler = Forwarder::new(resource.clone(), latest, Arc::clone(self));
        let handle = self
            .payments
            .start_with(payment_id, options, fetcher, handler)?;

        tracing::info!("Tracking {}", resource);
        self.report_finish(handle.clone(), resource);
        Ok(handle)
    }

    fn watch_active_rides(self: &Arc<Self>) -> Result<SubscriptionHandle<Vec<Ride>>> {
        let options = PollOptions::new(self.config.active_interval);
        let handler = ActiveRidesForwarder {
            tracker: Arc::clone(self),
        };
        let handle = self.active.start_with(
            ACTIVE_RIDES_ID,
            options,
            ActiveRidesFetcher::new(self.client.clone()),
            handler,
        )?;

        tracing::info!("Watching active rides");
        self.report_finish(handle.clone(), TrackedResource::ActiveRides);
        Ok(handle)
    }

    /// Start following a trip the first time a ride reports it.
    fn follow_trip(self: &Arc<Self>, trip_id: i64) {
        if self.trips.handle(&ResourceId::new(trip_id.to_string())).is_some() {
            return;
        }
        if let Err(e) = self.track_trip(trip_id) {
            tracing::warn!("Could not start tracking trip {}: {}", trip_id, e);
            self.emit(TrackerEvent::PollFailed {
                resource: TrackedResource::Trip(trip_id),
                message: e.to_string(),
            });
        }
    }

    /// Emit `Finished` once the subscription's task has exited.
    fn report_finish<S: PollState>(&self, handle: SubscriptionHandle<S>, resource: TrackedResource) {
        let events = self.events.clone();
        tokio::spawn(async move {
            handle.finished().await;
            let _ = events.send(TrackerEvent::Finished {
                resource,
                reason: handle.stop_reason(),
            });
        });
    }

    fn emit(&self, event: TrackerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Tracker event receiver dropped; event discarded");
        }
    }
}

fn payment_event(payment: &Payment) -> TrackerEvent {
    TrackerEvent::PaymentStatusChanged {
        payment_id: payment.payment_id.clone(),
        trip_id: payment.trip_id,
        status: payment.status,
        amount: payment.amount,
    }
}

/// Turns one subscription's callbacks into tracker events.
struct Forwarder<B> {
    resource: TrackedResource,
    latest: Latest<B>,
    tracker: Arc<TrackerInner>,
}

impl<B: Clone> Forwarder<B> {
    fn new(resource: TrackedResource, latest: Latest<B>, tracker: Arc<TrackerInner>) -> Self {
        Self {
            resource,
            latest,
            tracker,
        }
    }

    fn not_found(&self) {
        self.tracker.emit(TrackerEvent::NotFound {
            resource: self.resource.clone(),
        });
    }

    fn failed(&self, error: &FetchError) {
        self.tracker.emit(TrackerEvent::PollFailed {
            resource: self.resource.clone(),
            message: error.to_string(),
        });
    }
}

impl TransitionHandler<RideStatus> for Forwarder<Ride> {
    fn on_transition(&self, resource_id: &ResourceId, previous: Option<&RideStatus>, status: &RideStatus) {
        let ride = self.latest.get();
        let driver_id = ride.as_ref().and_then(|ride| ride.driver_id);
        let trip_id = ride.as_ref().and_then(|ride| ride.trip_id);

        self.tracker.emit(TrackerEvent::RideStatusChanged {
            ride_id: resource_id.to_string(),
            previous: previous.copied(),
            status: *status,
            driver_id,
            trip_id,
        });

        if let Some(trip_id) = trip_id {
            self.tracker.follow_trip(trip_id);
        }
    }

    fn on_not_found(&self, _resource_id: &ResourceId) {
        self.not_found();
    }

    fn on_error(&self, _resource_id: &ResourceId, error: &FetchError) {
        self.failed(error);
    }
}

impl TransitionHandler<TripStatus> for Forwarder<Trip> {
    fn on_transition(&self, _resource_id: &ResourceId, previous: Option<&TripStatus>, status: &TripStatus) {
        let total_fare = self.latest.get().and_then(|trip| trip.total_fare);
        let trip_id = match &self.resource {
            TrackedResource::Trip(id) => *id,
            _ => return,
        };

        self.tracker.emit(TrackerEvent::TripStatusChanged {
            trip_id,
            previous: previous.copied(),
            status: *status,
            total_fare,
        });
    }

    fn on_not_found(&self, _resource_id: &ResourceId) {
        self.not_found();
    }

    fn on_error(&self, _resource_id: &ResourceId, error: &FetchError) {
        self.failed(error);
    }
}

impl TransitionHandler<PaymentStatus> for Forwarder<Payment> {
    fn on_transition(
        &self,
        resource_id: &ResourceId,
        _previous: Option<&PaymentStatus>,
        status: &PaymentStatus,
    ) {
        let payment = self.latest.get();
        self.tracker.emit(TrackerEvent::PaymentStatusChanged {
            payment_id: resource_id.to_string(),
            trip_id: payment.as_ref().and_then(|payment| payment.trip_id),
            status: *status,
            amount: payment.as_ref().and_then(|payment| payment.amount),
        });
    }

    fn on_not_found(&self, _resource_id: &ResourceId) {
        self.not_found();
    }

    fn on_error(&self, _resource_id: &ResourceId, error: &FetchError) {
        self.failed(error);
    }
}

/// Reports every new active-rides list.
struct ActiveRidesForwarder {
    tracker: Arc<TrackerInner>,
}

impl TransitionHandler<Vec<Ride>> for ActiveRidesForwarder {
    fn on_transition(&self, _resource_id: &ResourceId, _previous: Option<&Vec<Ride>>, rides: &Vec<Ride>) {
        self.tracker.emit(TrackerEvent::ActiveRidesChanged {
            rides: rides.clone(),
        });
    }

    fn on_not_found(&self, _resource_id: &ResourceId) {
        self.tracker.emit(TrackerEvent::NotFound {
            resource: TrackedResource::ActiveRides,
        });
    }

    fn on_error(&self, _resource_id: &ResourceId, error: &FetchError) {
        self.tracker.emit(TrackerEvent::PollFailed {
            resource: TrackedResource::ActiveRides,
            message: error.to_string(),
        });
    }
}
