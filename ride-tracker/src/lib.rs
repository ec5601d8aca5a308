//! # ride-tracker
//!
//! Live tracking for the ride-hailing API. A [`RideTracker`] polls rides,
//! trips and payments and reports each status change once, as a
//! [`TrackerEvent`] on a channel:
//!
//! ```rust,ignore
//! use ride_tracker::{RideTracker, TrackerConfig};
//!
//! let (tracker, mut events) = RideTracker::new(TrackerConfig::default())?;
//! tracker.track_ride("RIDE-1A2B")?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event}");
//! }
//! ```
//!
//! Rides are followed until they complete, are cancelled or expire. When a
//! ride reports its trip, the trip is followed too, up to its final fare.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
mod recording;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use events::{TrackedResource, TrackerEvent};
pub use tracker::{payment_idempotency_key, ride_idempotency_key, RideTracker};
