use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::models::{Driver, ErrorBody, Location, Payment, PaymentRequest, Ride, RideRequest, Trip};

/// Async client for the ride-hailing REST API
///
/// One client holds one connection pool; clone it freely, clones share the
/// pool.
///
/// ```rust,ignore
/// use ride_api::{ApiConfig, RideApiClient};
///
/// let client = RideApiClient::new(ApiConfig::default())?;
/// let ride = client.get_ride("RIDE-1A2B").await?;
/// println!("{} is {}", ride.ride_id, ride.status);
/// ```
#[derive(Debug, Clone)]
pub struct RideApiClient {
    http: Client,
    base_url: Url,
}

impl RideApiClient {
    /// Create a client from a validated configuration
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// Create a client for the default local API
    pub fn local() -> Result<Self> {
        Self::new(ApiConfig::default())
    }

    /// The API root requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Rides

    /// Request a new ride (`POST /rides`)
    pub async fn create_ride(&self, request: &RideRequest) -> Result<Ride> {
        request.validate()?;
        let url = self.endpoint(&["rides"])?;
        tracing::debug!("Creating ride for rider {}", request.rider_id);
        self.execute(self.http.post(url).json(request), "ride request")
            .await
    }

    /// Fetch one ride by its alphanumeric id (`GET /rides/{rideId}`)
    pub async fn get_ride(&self, ride_id: &str) -> Result<Ride> {
        let ride_id = require_id("ride id", ride_id)?;
        let url = self.endpoint(&["rides", ride_id])?;
        self.execute(self.http.get(url), &format!("ride {}", ride_id))
            .await
    }

    /// List rides that have not finished (`GET /rides/active`)
    pub async fn active_rides(&self) -> Result<Vec<Ride>> {
        let url = self.endpoint(&["rides", "active"])?;
        self.execute(self.http.get(url), "active rides").await
    }

    // Trips

    /// Fetch one trip by its numeric id (`GET /trips/{id}`)
    pub async fn get_trip(&self, trip_id: i64) -> Result<Trip> {
        let url = self.endpoint(&["trips", &trip_id.to_string()])?;
        self.execute(self.http.get(url), &format!("trip {}", trip_id))
            .await
    }

    /// Start the trip for a ride, by the ride's numeric id (`POST /trips/{rideId}/start`)
    pub async fn start_trip(&self, ride_numeric_id: i64) -> Result<Trip> {
        self.trip_action(ride_numeric_id, "start", &format!("ride {}", ride_numeric_id))
            .await
    }

    /// Finish a trip, optionally recording where it ended (`POST /trips/{id}/end`)
    pub async fn end_trip(&self, trip_id: i64, end: Option<Location>) -> Result<Trip> {
        let url = self.endpoint(&["trips", &trip_id.to_string(), "end"])?;
        let mut request = self.http.post(url);
        if let Some(end) = end {
            end.validate()?;
            request = request.query(&[("endLatitude", end.latitude), ("endLongitude", end.longitude)]);
        }
        self.execute(request, &format!("trip {}", trip_id)).await
    }

    /// Pause a running trip (`POST /trips/{id}/pause`)
    pub async fn pause_trip(&self, trip_id: i64) -> Result<Trip> {
        self.trip_action(trip_id, "pause", &format!("trip {}", trip_id))
            .await
    }

    /// Resume a paused trip (`POST /trips/{id}/resume`)
    pub async fn resume_trip(&self, trip_id: i64) -> Result<Trip> {
        self.trip_action(trip_id, "resume", &format!("trip {}", trip_id))
            .await
    }

    async fn trip_action(&self, id: i64, action: &str, what: &str) -> Result<Trip> {
        let url = self.endpoint(&["trips", &id.to_string(), action])?;
        tracing::debug!("Trip action '{}' for {}", action, what);
        self.execute(self.http.post(url), what).await
    }

    // Drivers

    /// Fetch a driver (`GET /drivers/{driverId}`)
    pub async fn get_driver(&self, driver_id: &str) -> Result<Driver> {
        let driver_id = require_id("driver id", driver_id)?;
        let url = self.endpoint(&["drivers", driver_id])?;
        self.execute(self.http.get(url), &format!("driver {}", driver_id))
            .await
    }

    /// Report a driver's position (`POST /drivers/{driverId}/location`)
    pub async fn update_driver_location(&self, driver_id: &str, location: Location) -> Result<Driver> {
        let driver_id = require_id("driver id", driver_id)?;
        location.validate()?;
        let url = self.endpoint(&["drivers", driver_id, "location"])?;
        self.execute(
            self.http.post(url).json(&location),
            &format!("driver {}", driver_id),
        )
        .await
    }

    /// Accept a matched ride on behalf of a driver
    /// (`POST /drivers/{driverId}/accept?rideIdString={rideId}`)
    ///
    /// The ride is identified by its alphanumeric id only. The server starts
    /// the trip itself once the ride is accepted.
    pub async fn accept_ride(&self, driver_id: &str, ride_id: &str) -> Result<()> {
        let driver_id = require_id("driver id", driver_id)?;
        let ride_id = require_id("ride id", ride_id)?;
        let url = self.endpoint(&["drivers", driver_id, "accept"])?;
        let request = self
            .http
            .request(Method::POST, url)
            .query(&[("rideIdString", ride_id)]);

        let response = self.send(request).await?;
        if response.status().is_success() {
            tracing::info!("Driver {} accepted ride {}", driver_id, ride_id);
            return Ok(());
        }
        Err(error_from_response(response, &format!("ride {}", ride_id)).await)
    }

    // Payments

    /// Pay for a completed trip (`POST /payments`)
    pub async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment> {
        let url = self.endpoint(&["payments"])?;
        tracing::debug!("Processing payment for trip {}", request.trip_id);
        self.execute(
            self.http.post(url).json(request),
            &format!("trip {}", request.trip_id),
        )
        .await
    }

    /// Fetch a payment (`GET /payments/{paymentId}`)
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment> {
        let payment_id = require_id("payment id", payment_id)?;
        let url = self.endpoint(&["payments", payment_id])?;
        self.execute(self.http.get(url), &format!("payment {}", payment_id))
            .await
    }

    /// Build `{base}/{segments...}` with every segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("Request timed out: {}", e))
            } else {
                ApiError::Network(format!("Request failed: {}", e))
            }
        })
    }

    /// Send a request and decode a JSON success body
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response, what).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Decode(format!("Invalid {} response: {}", what, e)))
    }
}

fn require_id<'a>(name: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{} must not be empty", name)));
    }
    Ok(id)
}

/// Classify a non-success response, surfacing the server's error message
async fn error_from_response(response: Response, what: &str) -> ApiError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        tracing::debug!("{} not found", what);
        return ApiError::NotFound(what.to_string());
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    tracing::debug!("Request for {} failed with HTTP {}: {}", what, status.as_u16(), message);
    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = RideApiClient::new(ApiConfig::new().with_base_url("http://localhost:8080/v1/"))
            .expect("Failed to create client");

        let url = client.endpoint(&["rides", "RIDE 1/2"]).expect("endpoint");
        assert_eq!(url.as_str(), "http://localhost:8080/v1/rides/RIDE%201%2F2");

        let url = client.endpoint(&["trips", "42", "end"]).expect("endpoint");
        assert_eq!(url.as_str(), "http://localhost:8080/v1/trips/42/end");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RideApiClient::new(ApiConfig::new().with_base_url("localhost"));
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("ride id", " RIDE-1 ").expect("valid"), "RIDE-1");
        assert!(matches!(require_id("ride id", "   "), Err(ApiError::InvalidRequest(_))));
    }
}
