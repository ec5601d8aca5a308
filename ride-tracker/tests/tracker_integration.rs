//! End-to-end tracking against a mock ride API.

use mockito::{Matcher, Server, ServerGuard};
use ride_api::{ApiConfig, Location, PaymentStatus, RideRequest, RideStatus, TripStatus};
use ride_tracker::{RideTracker, TrackedResource, TrackerConfig, TrackerEvent};
use serde_json::json;
use status_poller::StopReason;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const INTERVAL: Duration = Duration::from_millis(50);

fn tracker_for(server: &ServerGuard) -> (RideTracker, UnboundedReceiver<TrackerEvent>) {
    let config = TrackerConfig::new()
        .with_api(ApiConfig::new().with_base_url(format!("{}/v1", server.url())))
        .with_interval(INTERVAL);
    RideTracker::new(config).expect("Failed to create tracker")
}

/// Collect events until `finished` resources have reported `Finished`.
async fn collect_until_finished(
    events: &mut UnboundedReceiver<TrackerEvent>,
    finished: usize,
) -> Vec<TrackerEvent> {
    let mut seen = Vec::new();
    let mut remaining = finished;
    tokio::time::timeout(Duration::from_secs(10), async {
        while remaining > 0 {
            let Some(event) = events.recv().await else { break };
            if matches!(event, TrackerEvent::Finished { .. }) {
                remaining -= 1;
            }
            seen.push(event);
        }
    })
    .await
    .expect("Timed out waiting for tracking to finish");
    seen
}

#[tokio::test]
async fn test_completed_ride_follows_trip_to_fare() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/rides/RIDE-1A2B")
        .with_status(200)
        .with_body(
            json!({
                "rideId": "RIDE-1A2B",
                "status": "COMPLETED",
                "driverId": 3,
                "tripId": 12
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/trips/12")
        .with_status(200)
        .with_body(
            json!({
                "id": 12,
                "status": "COMPLETED",
                "totalFare": 245.5
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    tracker.track_ride("RIDE-1A2B").expect("Failed to track ride");

    let seen = collect_until_finished(&mut events, 2).await;

    assert!(seen.contains(&TrackerEvent::RideStatusChanged {
        ride_id: "RIDE-1A2B".to_string(),
        previous: None,
        status: RideStatus::Completed,
        driver_id: Some(3),
        trip_id: Some(12),
    }));
    assert!(seen.contains(&TrackerEvent::TripStatusChanged {
        trip_id: 12,
        previous: None,
        status: TripStatus::Completed,
        total_fare: Some(245.5),
    }));
    assert!(seen.contains(&TrackerEvent::Finished {
        resource: TrackedResource::Trip(12),
        reason: Some(StopReason::Terminal),
    }));
    assert_eq!(tracker.active_count(), 0);
}

#[tokio::test]
async fn test_missing_ride_reports_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/rides/RIDE-GONE")
        .with_status(404)
        .with_body(r#"{"error":"Ride not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    tracker.track_ride("RIDE-GONE").expect("Failed to track ride");

    let seen = collect_until_finished(&mut events, 1).await;
    let resource = TrackedResource::Ride("RIDE-GONE".to_string());
    assert_eq!(
        seen,
        vec![
            TrackerEvent::NotFound {
                resource: resource.clone()
            },
            TrackerEvent::Finished {
                resource,
                reason: Some(StopReason::NotFound)
            },
        ]
    );
}

#[tokio::test]
async fn test_server_errors_are_reported_and_polling_continues() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/v1/trips/8")
        .with_status(503)
        .with_body(r#"{"error":"Service warming up"}"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    let handle = tracker.track_trip(8).expect("Failed to track trip");

    let mut failures = 0;
    tokio::time::timeout(Duration::from_secs(10), async {
        while failures < 2 {
            match events.recv().await {
                Some(TrackerEvent::PollFailed { resource, message }) => {
                    assert_eq!(resource, TrackedResource::Trip(8));
                    assert!(message.contains("Service warming up"));
                    failures += 1;
                }
                Some(other) => panic!("unexpected event {:?}", other),
                None => break,
            }
        }
    })
    .await
    .expect("Timed out waiting for poll failures");

    assert!(handle.is_active());
    tracker.stop().await;
    assert!(!handle.is_active());
    assert_eq!(handle.stop_reason(), Some(StopReason::Cancelled));
    failing.assert_async().await;
}

#[tokio::test]
async fn test_pay_follows_processing_payment() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/payments")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"tripId": 12})),
            Matcher::Regex(r#""idempotencyKey":"payment-12-\d+""#.to_string()),
        ]))
        .with_status(201)
        .with_body(json!({"paymentId": "PAY-77", "tripId": 12, "status": "PROCESSING"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/v1/payments/PAY-77")
        .with_status(200)
        .with_body(
            json!({"paymentId": "PAY-77", "tripId": 12, "amount": 245.5, "status": "SUCCESS"})
                .to_string(),
        )
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    let payment = tracker.pay(12).await.expect("Failed to pay");
    assert_eq!(payment.status, PaymentStatus::Processing);

    let seen = collect_until_finished(&mut events, 1).await;
    assert_eq!(
        seen[0],
        TrackerEvent::PaymentStatusChanged {
            payment_id: "PAY-77".to_string(),
            trip_id: Some(12),
            status: PaymentStatus::Success,
            amount: Some(245.5),
        }
    );
    create.assert_async().await;
}

#[tokio::test]
async fn test_pay_settled_immediately_does_not_poll() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/payments")
        .with_status(201)
        .with_body(json!({"paymentId": "PAY-5", "tripId": 4, "amount": 80.0, "status": "FAILED"}).to_string())
        .create_async()
        .await;
    let lookup = server
        .mock("GET", "/v1/payments/PAY-5")
        .expect(0)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    tracker.pay(4).await.expect("Failed to pay");

    assert_eq!(tracker.active_count(), 0);
    assert!(matches!(
        events.try_recv(),
        Ok(TrackerEvent::PaymentStatusChanged {
            status: PaymentStatus::Failed,
            ..
        })
    ));
    tokio::time::sleep(INTERVAL * 3).await;
    lookup.assert_async().await;
}

#[tokio::test]
async fn test_request_ride_tracks_new_ride() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/rides")
        .match_body(Matcher::Regex(r#""idempotencyKey":"ride-\d+""#.to_string()))
        .with_status(201)
        .with_body(json!({"rideId": "RIDE-NEW", "status": "PENDING"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/v1/rides/RIDE-NEW")
        .with_status(200)
        .with_body(json!({"rideId": "RIDE-NEW", "status": "CANCELLED"}).to_string())
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    let request = RideRequest::new(
        "RIDER-1",
        Location::new(28.7041, 77.1025),
        Location::new(28.5355, 77.3910),
    );
    let ride = tracker.request_ride(request).await.expect("Failed to request ride");
    assert_eq!(ride.ride_id, "RIDE-NEW");

    let seen = collect_until_finished(&mut events, 1).await;
    assert!(matches!(
        seen[0],
        TrackerEvent::RideStatusChanged {
            status: RideStatus::Cancelled,
            trip_id: None,
            ..
        }
    ));
    assert!(matches!(
        seen.last(),
        Some(TrackerEvent::Finished {
            reason: Some(StopReason::Terminal),
            ..
        })
    ));
}

#[tokio::test]
async fn test_watch_active_rides_reports_changes_only() {
    let mut server = Server::new_async().await;
    let listing = server
        .mock("GET", "/v1/rides/active")
        .with_status(200)
        .with_body(json!([{"rideId": "RIDE-1", "status": "MATCHED", "driverId": 3}]).to_string())
        .expect_at_least(2)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    let handle = tracker.watch_active_rides().expect("Failed to watch active rides");

    let first = tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("Timed out waiting for active rides")
        .expect("Event channel closed");
    let TrackerEvent::ActiveRidesChanged { rides } = first else {
        panic!("unexpected event {:?}", first);
    };
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].ride_id, "RIDE-1");
    assert_eq!(rides[0].status, RideStatus::Matched);

    // Unchanged refreshes keep polling without repeating the list
    tokio::time::sleep(INTERVAL * 5).await;
    assert!(handle.is_active());
    assert_eq!(tracker.active_count(), 1);
    assert!(events.try_recv().is_err());
    listing.assert_async().await;

    tracker.stop().await;
    assert_eq!(handle.stop_reason(), Some(StopReason::Cancelled));
}

#[tokio::test]
async fn test_watch_active_rides_reports_failures_and_keeps_refreshing() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/v1/rides/active")
        .with_status(500)
        .with_body(r#"{"error":"Ride store unavailable"}"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let (tracker, mut events) = tracker_for(&server);
    let handle = tracker.watch_active_rides().expect("Failed to watch active rides");

    let mut failures = 0;
    tokio::time::timeout(Duration::from_secs(10), async {
        while failures < 2 {
            match events.recv().await {
                Some(TrackerEvent::PollFailed { resource, message }) => {
                    assert_eq!(resource, TrackedResource::ActiveRides);
                    assert!(message.contains("Ride store unavailable"));
                    failures += 1;
                }
                Some(other) => panic!("unexpected event {:?}", other),
                None => break,
            }
        }
    })
    .await
    .expect("Timed out waiting for poll failures");

    assert!(handle.is_active());
    tracker.stop().await;
    failing.assert_async().await;
}
