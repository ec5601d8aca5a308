//! Fetchers that remember the last response body.
//!
//! A poller only compares statuses, but tracking events also carry details
//! from the response (assigned driver, trip id, fare). [`Recording`] keeps the
//! body of the most recent successful fetch so the transition callback, which
//! runs right after that fetch on the same task, can read it.

use async_trait::async_trait;
use parking_lot::Mutex;
use ride_api::{
    Payment, PaymentStatus, PaymentStatusFetcher, Ride, RideStatus, RideStatusFetcher, Trip,
    TripStatus, TripStatusFetcher,
};
use status_poller::{FetchOutcome, FetchResult, PollState, ResourceId, StatusFetcher};
use std::sync::Arc;

/// Shared slot holding the latest body.
#[derive(Debug)]
pub(crate) struct Latest<T>(Arc<Mutex<Option<T>>>);

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Clone> Latest<T> {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub(crate) fn store(&self, body: T) {
        *self.0.lock() = Some(body);
    }

    pub(crate) fn get(&self) -> Option<T> {
        self.0.lock().clone()
    }
}

/// A fetcher that can return the whole resource, not only its status.
#[async_trait]
pub(crate) trait BodyFetcher: Send + Sync + 'static {
    type Body: Clone + Send + Sync + 'static;
    type Status: PollState;

    async fn fetch_body(&self, resource_id: &ResourceId) -> FetchResult<Self::Body>;

    fn status_of(body: &Self::Body) -> Self::Status;
}

#[async_trait]
impl BodyFetcher for RideStatusFetcher {
    type Body = Ride;
    type Status = RideStatus;

    async fn fetch_body(&self, resource_id: &ResourceId) -> FetchResult<Ride> {
        self.fetch_ride(resource_id).await
    }

    fn status_of(body: &Ride) -> RideStatus {
        body.status
    }
}

#[async_trait]
impl BodyFetcher for TripStatusFetcher {
    type Body = Trip;
    type Status = TripStatus;

    async fn fetch_body(&self, resource_id: &ResourceId) -> FetchResult<Trip> {
        self.fetch_trip(resource_id).await
    }

    fn status_of(body: &Trip) -> TripStatus {
        body.status
    }
}

#[async_trait]
impl BodyFetcher for PaymentStatusFetcher {
    type Body = Payment;
    type Status = PaymentStatus;

    async fn fetch_body(&self, resource_id: &ResourceId) -> FetchResult<Payment> {
        self.fetch_payment(resource_id).await
    }

    fn status_of(body: &Payment) -> PaymentStatus {
        body.status
    }
}

/// Status fetcher that records each body it fetches into a [`Latest`] slot.
pub(crate) struct Recording<F: BodyFetcher> {
    inner: F,
    latest: Latest<F::Body>,
}

impl<F: BodyFetcher> Recording<F> {
    pub(crate) fn new(inner: F) -> (Self, Latest<F::Body>) {
        let latest = Latest::new();
        (
            Self {
                inner,
                latest: latest.clone(),
            },
            latest,
        )
    }
}

#[async_trait]
impl<F: BodyFetcher> StatusFetcher<F::Status> for Recording<F> {
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<F::Status> {
        match self.inner.fetch_body(resource_id).await? {
            FetchOutcome::Found(body) => {
                let status = F::status_of(&body);
                self.latest.store(body);
                Ok(FetchOutcome::Found(status))
            }
            FetchOutcome::NotFound => Ok(FetchOutcome::NotFound),
        }
    }
}
