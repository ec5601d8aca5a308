//! # ride-api
//!
//! Typed async client for the ride-hailing REST API, plus
//! [`StatusFetcher`](status_poller::StatusFetcher) adapters so rides, trips
//! and payments can be tracked with a [`StatusPoller`](status_poller::StatusPoller).
//!
//! ```rust,ignore
//! use ride_api::{RideApiClient, RideStatus, RideStatusFetcher};
//! use status_poller::{CallbackHandler, StatusPoller};
//! use std::time::Duration;
//!
//! let client = RideApiClient::local()?;
//! let poller = StatusPoller::new();
//! poller.start(
//!     "RIDE-1A2B",
//!     Duration::from_secs(2),
//!     RideStatus::TERMINAL,
//!     RideStatusFetcher::new(client),
//!     CallbackHandler::new().on_transition(|id, _, status: &RideStatus| {
//!         println!("{id}: {status}");
//!     }),
//! )?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod models;
pub mod status;

pub use client::RideApiClient;
pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use fetchers::{
    parse_trip_id, ActiveRidesFetcher, PaymentStatusFetcher, RideStatusFetcher, TripStatusFetcher,
};
pub use models::{Driver, Location, Payment, PaymentRequest, Ride, RideRequest, Trip};
pub use status::{DriverStatus, PaymentStatus, RideStatus, TripStatus};
