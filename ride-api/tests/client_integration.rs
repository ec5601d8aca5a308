//! HTTP-level tests for the ride API client against a mock server.

use mockito::{Matcher, Server, ServerGuard};
use ride_api::{
    ApiConfig, ApiError, DriverStatus, Location, PaymentRequest, PaymentStatus, RideApiClient,
    RideRequest, RideStatus, TripStatus,
};
use rstest::rstest;
use serde_json::json;

async fn client_for(server: &ServerGuard) -> RideApiClient {
    RideApiClient::new(ApiConfig::new().with_base_url(format!("{}/v1", server.url())))
        .expect("Failed to create client")
}

fn ride_json(status: &str, trip_id: Option<i64>) -> String {
    json!({
        "rideId": "RIDE-1A2B",
        "riderId": "RIDER-1",
        "status": status,
        "driverId": 3,
        "tripId": trip_id,
        "createdAt": "2024-05-01T10:15:30.123",
        "matchedAt": "2024-05-01T10:15:31",
        "acceptedAt": null
    })
    .to_string()
}

#[tokio::test]
async fn test_create_ride_posts_camel_case_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/rides")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "riderId": "RIDER-1",
            "pickupLatitude": 28.7041,
            "tier": "ECONOMY",
            "paymentMethod": "CARD",
            "idempotencyKey": "ride-1"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(ride_json("PENDING", None))
        .create_async()
        .await;

    let client = client_for(&server).await;
    let request = RideRequest::new(
        "RIDER-1",
        Location::new(28.7041, 77.1025),
        Location::new(28.5355, 77.3910),
    )
    .with_idempotency_key("ride-1");

    let ride = client.create_ride(&request).await.expect("Failed to create ride");
    assert_eq!(ride.ride_id, "RIDE-1A2B");
    assert_eq!(ride.status, RideStatus::Pending);
    assert_eq!(ride.trip_id, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_ride_rejects_invalid_request_locally() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/v1/rides").expect(0).create_async().await;

    let client = client_for(&server).await;
    let request = RideRequest::new("", Location::new(1.0, 2.0), Location::new(3.0, 4.0));
    let result = client.create_ride(&request).await;

    assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_ride_and_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/rides/RIDE-1A2B")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ride_json("IN_PROGRESS", Some(12)))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/rides/RIDE-GONE")
        .with_status(404)
        .with_body(r#"{"error":"Ride not found: RIDE-GONE"}"#)
        .create_async()
        .await;

    let client = client_for(&server).await;

    let ride = client.get_ride("RIDE-1A2B").await.expect("Failed to get ride");
    assert_eq!(ride.status, RideStatus::InProgress);
    assert_eq!(ride.trip_id, Some(12));
    assert_eq!(ride.driver_id, Some(3));

    let missing = client.get_ride("RIDE-GONE").await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

#[rstest]
#[case(400, r#"{"error":"Trip is not in progress"}"#, "Trip is not in progress")]
#[case(500, r#"{"error":"An unexpected error occurred"}"#, "An unexpected error occurred")]
#[case(400, r#"{"message":"Validation failed"}"#, "Validation failed")]
#[case(502, "<html>bad gateway</html>", "Bad Gateway")]
#[tokio::test]
async fn test_error_bodies_surface_server_message(
    #[case] status: usize,
    #[case] body: &str,
    #[case] expected: &str,
) {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/trips/7/pause")
        .with_status(status)
        .with_body(body)
        .create_async()
        .await;

    let client = client_for(&server).await;
    match client.pause_trip(7).await {
        Err(ApiError::Http { status: got, message }) => {
            assert_eq!(got as usize, status);
            assert_eq!(message, expected);
        }
        other => panic!("expected an HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_trip_lifecycle_endpoints() {
    let mut server = Server::new_async().await;
    let trip = |status: &str| {
        let fare = (status == "COMPLETED").then_some(245.5);
        json!({
            "id": 12,
            "tripId": "TRIP-9F",
            "rideId": 4,
            "status": status,
            "totalFare": fare
        })
        .to_string()
    };

    let start = server
        .mock("POST", "/v1/trips/4/start")
        .with_status(201)
        .with_body(trip("STARTED"))
        .create_async()
        .await;
    let resume = server
        .mock("POST", "/v1/trips/12/resume")
        .with_status(200)
        .with_body(trip("RESUMED"))
        .create_async()
        .await;
    let end = server
        .mock("POST", "/v1/trips/12/end")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("endLatitude".into(), "28.5355".into()),
            Matcher::UrlEncoded("endLongitude".into(), "77.391".into()),
        ]))
        .with_status(200)
        .with_body(trip("COMPLETED"))
        .create_async()
        .await;

    let client = client_for(&server).await;

    let started = client.start_trip(4).await.expect("Failed to start trip");
    assert_eq!(started.status, TripStatus::Started);

    let resumed = client.resume_trip(12).await.expect("Failed to resume trip");
    assert_eq!(resumed.status, TripStatus::Resumed);

    let ended = client
        .end_trip(12, Some(Location::new(28.5355, 77.391)))
        .await
        .expect("Failed to end trip");
    assert_eq!(ended.status, TripStatus::Completed);
    assert_eq!(ended.total_fare, Some(245.5));

    start.assert_async().await;
    resume.assert_async().await;
    end.assert_async().await;
}

#[tokio::test]
async fn test_driver_endpoints() {
    let mut server = Server::new_async().await;
    let driver = json!({
        "id": 3,
        "driverId": "DRIVER-3",
        "name": "Asha",
        "status": "ON_TRIP",
        "latitude": 28.61,
        "longitude": 77.2,
        "currentRideId": 4
    })
    .to_string();

    let location = server
        .mock("POST", "/v1/drivers/DRIVER-3/location")
        .match_body(Matcher::Json(json!({"latitude": 28.61, "longitude": 77.2})))
        .with_status(200)
        .with_body(&driver)
        .create_async()
        .await;
    let accept = server
        .mock("POST", "/v1/drivers/DRIVER-3/accept")
        .match_query(Matcher::UrlEncoded("rideIdString".into(), "RIDE-1A2B".into()))
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/drivers/DRIVER-3")
        .with_status(200)
        .with_body(&driver)
        .create_async()
        .await;

    let client = client_for(&server).await;

    let updated = client
        .update_driver_location("DRIVER-3", Location::new(28.61, 77.2))
        .await
        .expect("Failed to update location");
    assert_eq!(updated.status, DriverStatus::OnTrip);

    client
        .accept_ride("DRIVER-3", "RIDE-1A2B")
        .await
        .expect("Failed to accept ride");

    let fetched = client.get_driver("DRIVER-3").await.expect("Failed to get driver");
    assert_eq!(fetched.current_ride_id, Some(4));

    location.assert_async().await;
    accept.assert_async().await;
}

#[tokio::test]
async fn test_accept_ride_not_matched_to_driver() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/drivers/DRIVER-9/accept")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"This ride is not matched to driver DRIVER-9"}"#)
        .create_async()
        .await;

    let client = client_for(&server).await;
    let result = client.accept_ride("DRIVER-9", "RIDE-1A2B").await;

    match result {
        Err(ApiError::Http { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("not matched"));
        }
        other => panic!("expected an HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_payment_endpoints() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/payments")
        .match_body(Matcher::Json(json!({
            "tripId": 12,
            "idempotencyKey": "payment-12-1700000000000"
        })))
        .with_status(201)
        .with_body(
            json!({
                "paymentId": "PAY-77",
                "tripId": 12,
                "amount": 245.5,
                "status": "PROCESSING"
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/v1/payments/PAY-77")
        .with_status(200)
        .with_body(
            json!({
                "paymentId": "PAY-77",
                "tripId": 12,
                "amount": 245.5,
                "status": "SUCCESS",
                "pspTransactionId": "psp-abc"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server).await;

    let payment = client
        .process_payment(&PaymentRequest::new(12).with_idempotency_key("payment-12-1700000000000"))
        .await
        .expect("Failed to process payment");
    assert_eq!(payment.status, PaymentStatus::Processing);

    let settled = client.get_payment("PAY-77").await.expect("Failed to get payment");
    assert_eq!(settled.status, PaymentStatus::Success);
    assert_eq!(settled.psp_transaction_id.as_deref(), Some("psp-abc"));

    create.assert_async().await;
}

#[tokio::test]
async fn test_active_rides_and_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/rides/active")
        .with_status(200)
        .with_body(format!("[{}]", ride_json("MATCHED", None)))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/trips/5")
        .with_status(200)
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let client = client_for(&server).await;

    let active = client.active_rides().await.expect("Failed to list rides");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, RideStatus::Matched);

    let broken = client.get_trip(5).await;
    assert!(matches!(broken, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Port 9 (discard) is not expected to be listening
    let client = RideApiClient::new(
        ApiConfig::new()
            .with_base_url("http://127.0.0.1:9/v1")
            .with_connect_timeout(std::time::Duration::from_millis(200)),
    )
    .expect("Failed to create client");

    let result = client.get_ride("RIDE-1").await;
    assert!(matches!(result, Err(ApiError::Network(_))));
}
