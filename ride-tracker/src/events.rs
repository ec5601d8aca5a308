//! Events emitted while tracking rides, trips and payments.

use ride_api::{PaymentStatus, Ride, RideStatus, TripStatus};
use status_poller::StopReason;
use std::fmt;

/// A resource the tracker polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackedResource {
    /// A ride, by its alphanumeric id
    Ride(String),
    /// A trip, by its numeric id
    Trip(i64),
    /// A payment, by its id
    Payment(String),
    /// The list of rides still in progress
    ActiveRides,
}

impl fmt::Display for TrackedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackedResource::Ride(id) => write!(f, "ride {}", id),
            TrackedResource::Trip(id) => write!(f, "trip {}", id),
            TrackedResource::Payment(id) => write!(f, "payment {}", id),
            TrackedResource::ActiveRides => write!(f, "active rides"),
        }
    }
}

/// Something observed about a tracked resource.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A ride moved to a new status
    RideStatusChanged {
        ride_id: String,
        previous: Option<RideStatus>,
        status: RideStatus,
        driver_id: Option<i64>,
        trip_id: Option<i64>,
    },

    /// A trip moved to a new status; `total_fare` is set once the fare is known
    TripStatusChanged {
        trip_id: i64,
        previous: Option<TripStatus>,
        status: TripStatus,
        total_fare: Option<f64>,
    },

    /// A payment moved to a new status
    PaymentStatusChanged {
        payment_id: String,
        trip_id: Option<i64>,
        status: PaymentStatus,
        amount: Option<f64>,
    },

    /// The list of active rides changed
    ActiveRidesChanged { rides: Vec<Ride> },

    /// The API no longer knows the resource
    NotFound { resource: TrackedResource },

    /// A poll failed; tracking continues
    PollFailed {
        resource: TrackedResource,
        message: String,
    },

    /// Tracking of a resource ended
    Finished {
        resource: TrackedResource,
        reason: Option<StopReason>,
    },
}

impl TrackerEvent {
    /// The resource this event is about.
    pub fn resource(&self) -> TrackedResource {
        match self {
            TrackerEvent::RideStatusChanged { ride_id, .. } => TrackedResource::Ride(ride_id.clone()),
            TrackerEvent::TripStatusChanged { trip_id, .. } => TrackedResource::Trip(*trip_id),
            TrackerEvent::PaymentStatusChanged { payment_id, .. } => {
                TrackedResource::Payment(payment_id.clone())
            }
            TrackerEvent::ActiveRidesChanged { .. } => TrackedResource::ActiveRides,
            TrackerEvent::NotFound { resource }
            | TrackerEvent::PollFailed { resource, .. }
            | TrackerEvent::Finished { resource, .. } => resource.clone(),
        }
    }
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEvent::RideStatusChanged {
                ride_id,
                status,
                driver_id,
                trip_id,
                ..
            } => {
                write!(f, "Ride {} is {}", ride_id, status)?;
                if let Some(driver_id) = driver_id {
                    write!(f, " | driver {}", driver_id)?;
                }
                if let Some(trip_id) = trip_id {
                    write!(f, " | trip {}", trip_id)?;
                }
                Ok(())
            }
            TrackerEvent::TripStatusChanged {
                trip_id,
                status,
                total_fare,
                ..
            } => match total_fare {
                Some(fare) => write!(f, "Trip {} is {} | total fare {:.2}", trip_id, status, fare),
                None => write!(f, "Trip {} is {}", trip_id, status),
            },
            TrackerEvent::PaymentStatusChanged {
                payment_id,
                status,
                amount,
                ..
            } => match amount {
                Some(amount) => write!(f, "Payment {} is {} | amount {:.2}", payment_id, status, amount),
                None => write!(f, "Payment {} is {}", payment_id, status),
            },
            TrackerEvent::ActiveRidesChanged { rides } => {
                if rides.is_empty() {
                    return write!(f, "No active rides");
                }
                write!(f, "Active rides ({}):", rides.len())?;
                for ride in rides {
                    write!(f, "\n  {}  {}", ride.ride_id, ride.status)?;
                    if let Some(driver_id) = ride.driver_id {
                        write!(f, "  driver {}", driver_id)?;
                    }
                }
                Ok(())
            }
            TrackerEvent::NotFound { resource } => {
                write!(f, "{} not found; tracking stopped", capitalize(resource))
            }
            TrackerEvent::PollFailed { resource, message } => {
                write!(f, "Error polling {}: {}", resource, message)
            }
            TrackerEvent::Finished { resource, reason } => match reason {
                Some(reason) => write!(f, "Stopped tracking {} ({})", resource, reason),
                None => write!(f, "Stopped tracking {}", resource),
            },
        }
    }
}

fn capitalize(resource: &TrackedResource) -> String {
    let text = resource.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}
