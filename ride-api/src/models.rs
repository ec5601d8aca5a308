//! Request and response bodies exchanged with the ride API.
//!
//! All bodies use camelCase keys. Timestamps are server-local and carry no
//! offset, so they are kept as [`NaiveDateTime`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::status::{DriverStatus, PaymentStatus, RideStatus, TripStatus};

/// Tier requested when none is given.
pub const DEFAULT_TIER: &str = "ECONOMY";

/// Payment method used when none is given.
pub const DEFAULT_PAYMENT_METHOD: &str = "CARD";

/// A latitude/longitude pair, also the body of a driver location update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject coordinates outside the valid WGS84 ranges.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ApiError::InvalidRequest(format!(
                "latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ApiError::InvalidRequest(format!(
                "longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Body of `POST /rides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub rider_id: String,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    pub tier: String,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl RideRequest {
    /// Request an economy ride paid by card.
    pub fn new(rider_id: impl Into<String>, pickup: Location, destination: Location) -> Self {
        Self {
            rider_id: rider_id.into(),
            pickup_latitude: pickup.latitude,
            pickup_longitude: pickup.longitude,
            destination_latitude: destination.latitude,
            destination_longitude: destination.longitude,
            pickup_address: None,
            destination_address: None,
            tier: DEFAULT_TIER.to_string(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            idempotency_key: None,
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = method.into();
        self
    }

    pub fn with_addresses(mut self, pickup: impl Into<String>, destination: impl Into<String>) -> Self {
        self.pickup_address = Some(pickup.into());
        self.destination_address = Some(destination.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn pickup(&self) -> Location {
        Location::new(self.pickup_latitude, self.pickup_longitude)
    }

    pub fn destination(&self) -> Location {
        Location::new(self.destination_latitude, self.destination_longitude)
    }

    /// Check the fields the server requires before sending.
    pub fn validate(&self) -> Result<()> {
        if self.rider_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("rider id is required".to_string()));
        }
        if self.tier.trim().is_empty() {
            return Err(ApiError::InvalidRequest("tier is required".to_string()));
        }
        if self.payment_method.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "payment method is required".to_string(),
            ));
        }
        self.pickup().validate()?;
        self.destination().validate()
    }
}

/// A ride as reported by `GET /rides/{rideId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub ride_id: String,
    #[serde(default)]
    pub rider_id: Option<String>,
    pub status: RideStatus,
    #[serde(default)]
    pub driver_id: Option<i64>,
    #[serde(default)]
    pub trip_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub matched_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub accepted_at: Option<NaiveDateTime>,
}

/// A trip with its fare breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    #[serde(default)]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub ride_id: Option<i64>,
    #[serde(default)]
    pub driver_id: Option<i64>,
    #[serde(default)]
    pub rider_id: Option<String>,
    pub status: TripStatus,
    #[serde(default)]
    pub start_latitude: Option<f64>,
    #[serde(default)]
    pub start_longitude: Option<f64>,
    #[serde(default)]
    pub end_latitude: Option<f64>,
    #[serde(default)]
    pub end_longitude: Option<f64>,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub pause_start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub total_pause_duration_seconds: Option<i64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub base_fare: Option<f64>,
    #[serde(default)]
    pub distance_fare: Option<f64>,
    #[serde(default)]
    pub time_fare: Option<f64>,
    #[serde(default)]
    pub surge_multiplier: Option<f64>,
    #[serde(default)]
    pub total_fare: Option<f64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub trip_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl PaymentRequest {
    pub fn new(trip_id: i64) -> Self {
        Self {
            trip_id,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A payment and its processor outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    #[serde(default)]
    pub trip_id: Option<i64>,
    #[serde(default)]
    pub amount: Option<f64>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub psp_transaction_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// A driver and their last reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(default)]
    pub id: Option<i64>,
    pub driver_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    pub status: DriverStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub last_location_update: Option<NaiveDateTime>,
    #[serde(default)]
    pub current_ride_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Error body returned by the server alongside non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|msg| !msg.is_empty())
    }
}
