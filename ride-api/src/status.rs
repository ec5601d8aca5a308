//! Status vocabularies reported by the ride API.
//!
//! Statuses travel as upper-case strings (`"IN_PROGRESS"`). Each enum has an
//! `Unknown` catch-all so a status added on the server does not break polling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a ride request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Pending,
    Matched,
    Accepted,
    DriverArrived,
    InProgress,
    Completed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RideStatus {
    /// States after which a ride never changes again.
    pub const TERMINAL: [RideStatus; 3] = [
        RideStatus::Completed,
        RideStatus::Cancelled,
        RideStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "PENDING",
            RideStatus::Matched => "MATCHED",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::DriverArrived => "DRIVER_ARRIVED",
            RideStatus::InProgress => "IN_PROGRESS",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
            RideStatus::Expired => "EXPIRED",
            RideStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// Position in the ride lifecycle, used to ignore stale reads.
    ///
    /// Unrecognised statuses rank with `Pending`, so they are only reported
    /// before the ride has progressed.
    pub fn lifecycle_rank(&self) -> u32 {
        match self {
            RideStatus::Pending | RideStatus::Unknown => 0,
            RideStatus::Matched => 1,
            RideStatus::Accepted => 2,
            RideStatus::DriverArrived => 3,
            RideStatus::InProgress => 4,
            RideStatus::Completed | RideStatus::Cancelled | RideStatus::Expired => 5,
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a trip once the driver has picked the rider up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Started,
    Paused,
    Resumed,
    Completed,
    #[serde(other)]
    Unknown,
}

impl TripStatus {
    pub const TERMINAL: [TripStatus; 1] = [TripStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Started => "STARTED",
            TripStatus::Paused => "PAUSED",
            TripStatus::Resumed => "RESUMED",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub const TERMINAL: [PaymentStatus; 2] = [PaymentStatus::Success, PaymentStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Available,
    Assigned,
    OnTrip,
    Offline,
    #[serde(other)]
    Unknown,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Available => "AVAILABLE",
            DriverStatus::Assigned => "ASSIGNED",
            DriverStatus::OnTrip => "ON_TRIP",
            DriverStatus::Offline => "OFFLINE",
            DriverStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\"PENDING\"", RideStatus::Pending)]
    #[case("\"DRIVER_ARRIVED\"", RideStatus::DriverArrived)]
    #[case("\"IN_PROGRESS\"", RideStatus::InProgress)]
    #[case("\"EXPIRED\"", RideStatus::Expired)]
    #[case("\"REASSIGNING\"", RideStatus::Unknown)]
    fn test_ride_status_parsing(#[case] json: &str, #[case] expected: RideStatus) {
        let status: RideStatus = serde_json::from_str(json).expect("Failed to parse status");
        assert_eq!(status, expected);
    }

    #[rstest]
    #[case(RideStatus::Pending, false)]
    #[case(RideStatus::InProgress, false)]
    #[case(RideStatus::Completed, true)]
    #[case(RideStatus::Cancelled, true)]
    #[case(RideStatus::Expired, true)]
    fn test_ride_terminal_states(#[case] status: RideStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[test]
    fn test_ride_lifecycle_rank_is_monotonic() {
        let lifecycle = [
            RideStatus::Pending,
            RideStatus::Matched,
            RideStatus::Accepted,
            RideStatus::DriverArrived,
            RideStatus::InProgress,
            RideStatus::Completed,
        ];
        for pair in lifecycle.windows(2) {
            assert!(pair[0].lifecycle_rank() < pair[1].lifecycle_rank());
        }
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(RideStatus::DriverArrived.to_string(), "DRIVER_ARRIVED");
        assert_eq!(TripStatus::Paused.to_string(), "PAUSED");
        assert_eq!(PaymentStatus::Processing.to_string(), "PROCESSING");
        assert_eq!(DriverStatus::OnTrip.to_string(), "ON_TRIP");

        let json = serde_json::to_string(&DriverStatus::OnTrip).expect("Failed to serialize");
        assert_eq!(json, "\"ON_TRIP\"");
    }

    #[test]
    fn test_unknown_statuses_do_not_fail() {
        let trip: TripStatus = serde_json::from_str("\"ABANDONED\"").expect("Failed to parse");
        assert_eq!(trip, TripStatus::Unknown);
        let payment: PaymentStatus = serde_json::from_str("\"REFUNDED\"").expect("Failed to parse");
        assert_eq!(payment, PaymentStatus::Unknown);
        assert!(!payment.is_terminal());
    }
}
