//! [`StatusFetcher`] adapters over [`RideApiClient`].
//!
//! Each adapter reads one resource's status for a polling subscription. A
//! 404 becomes [`FetchOutcome::NotFound`]; any other failure is a transient
//! [`FetchError`] and the subscription keeps polling.

use async_trait::async_trait;
use status_poller::{FetchError, FetchOutcome, FetchResult, ResourceId, StatusFetcher};

use crate::client::RideApiClient;
use crate::error::{ApiError, Result};
use crate::models::{Payment, Ride, Trip};
use crate::status::{PaymentStatus, RideStatus, TripStatus};

/// Map a client result onto a fetch outcome.
fn into_outcome<T, S>(result: Result<T>, status: impl FnOnce(T) -> S) -> FetchResult<S> {
    match result {
        Ok(body) => Ok(FetchOutcome::Found(status(body))),
        Err(ApiError::NotFound(_)) => Ok(FetchOutcome::NotFound),
        Err(error) => Err(error.into()),
    }
}

/// Parse a trip resource id into the numeric id the API expects.
pub fn parse_trip_id(resource_id: &ResourceId) -> std::result::Result<i64, FetchError> {
    resource_id
        .as_str()
        .trim()
        .parse::<i64>()
        .map_err(|_| FetchError::Other(format!("Invalid trip id '{}'", resource_id)))
}

/// Polls `GET /rides/{rideId}` and reports the ride's status.
#[derive(Debug, Clone)]
pub struct RideStatusFetcher {
    client: RideApiClient,
}

impl RideStatusFetcher {
    pub fn new(client: RideApiClient) -> Self {
        Self { client }
    }

    /// Fetch the whole ride, for callers that need more than the status.
    pub async fn fetch_ride(&self, resource_id: &ResourceId) -> FetchResult<Ride> {
        into_outcome(self.client.get_ride(resource_id.as_str()).await, |ride| ride)
    }
}

#[async_trait]
impl StatusFetcher<RideStatus> for RideStatusFetcher {
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<RideStatus> {
        into_outcome(self.client.get_ride(resource_id.as_str()).await, |ride| {
            ride.status
        })
    }
}

/// Polls `GET /trips/{id}`; the resource id is the trip's numeric id.
#[derive(Debug, Clone)]
pub struct TripStatusFetcher {
    client: RideApiClient,
}

impl TripStatusFetcher {
    pub fn new(client: RideApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch_trip(&self, resource_id: &ResourceId) -> FetchResult<Trip> {
        let trip_id = parse_trip_id(resource_id)?;
        into_outcome(self.client.get_trip(trip_id).await, |trip| trip)
    }
}

#[async_trait]
impl StatusFetcher<TripStatus> for TripStatusFetcher {
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<TripStatus> {
        let trip_id = parse_trip_id(resource_id)?;
        into_outcome(self.client.get_trip(trip_id).await, |trip| trip.status)
    }
}

/// Polls `GET /payments/{paymentId}`.
#[derive(Debug, Clone)]
pub struct PaymentStatusFetcher {
    client: RideApiClient,
}

impl PaymentStatusFetcher {
    pub fn new(client: RideApiClient) -> Self {
        Self { client }
    }

    pub async fn fetch_payment(&self, resource_id: &ResourceId) -> FetchResult<Payment> {
        into_outcome(
            self.client.get_payment(resource_id.as_str()).await,
            |payment| payment,
        )
    }
}

#[async_trait]
impl StatusFetcher<PaymentStatus> for PaymentStatusFetcher {
    async fn fetch_status(&self, resource_id: &ResourceId) -> FetchResult<PaymentStatus> {
        into_outcome(
            self.client.get_payment(resource_id.as_str()).await,
            |payment| payment.status,
        )
    }
}

/// Polls `GET /rides/active`; the whole list is the observed state, so a
/// change to any ride in it is a transition.
///
/// The resource id is only a label for the subscription.
#[derive(Debug, Clone)]
pub struct ActiveRidesFetcher {
    client: RideApiClient,
}

impl ActiveRidesFetcher {
    pub fn new(client: RideApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusFetcher<Vec<Ride>> for ActiveRidesFetcher {
    async fn fetch_status(&self, _resource_id: &ResourceId) -> FetchResult<Vec<Ride>> {
        into_outcome(self.client.active_rides().await, |rides| rides)
    }
}
