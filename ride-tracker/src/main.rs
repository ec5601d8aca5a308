use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ride_api::{ApiConfig, Location, RideRequest};
use ride_tracker::logging::{init_logging_with_level, LoggingMode};
use ride_tracker::{RideTracker, TrackerConfig, TrackerEvent};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Ride tracker
///
/// Follows rides, trips and payments on the ride-hailing API and prints each
/// status change as it happens.
#[derive(Parser, Debug)]
#[command(name = "ride-tracker")]
#[command(about = "Track rides, trips and payments on the ride-hailing API")]
#[command(version)]
pub struct Args {
    /// API root URL
    #[arg(long, env = "RIDE_API_URL", default_value = ride_api::DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Polling interval in milliseconds for every resource kind
    /// [default: 2000 for rides and payments, 3000 for trips and active rides]
    #[arg(long, env = "RIDE_POLL_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RIDE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output (silent, development, debug, json)
    #[arg(long, env = "RIDE_LOG_MODE", default_value = "development")]
    pub log_mode: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow a ride, and its trip once assigned
    Ride {
        /// Alphanumeric ride id
        ride_id: String,
    },
    /// Follow a trip
    Trip {
        /// Numeric trip id
        trip_id: i64,
    },
    /// Request a ride and follow it
    Request {
        #[arg(long, default_value = "RIDER-1")]
        rider: String,
        #[arg(long, default_value = "28.7041", allow_negative_numbers = true)]
        pickup_lat: f64,
        #[arg(long, default_value = "77.1025", allow_negative_numbers = true)]
        pickup_lng: f64,
        #[arg(long, default_value = "28.5355", allow_negative_numbers = true)]
        dest_lat: f64,
        #[arg(long, default_value = "77.3910", allow_negative_numbers = true)]
        dest_lng: f64,
        #[arg(long, default_value = ride_api::models::DEFAULT_TIER)]
        tier: String,
        #[arg(long, default_value = ride_api::models::DEFAULT_PAYMENT_METHOD)]
        payment_method: String,
    },
    /// Pay for a completed trip and follow the payment
    Pay {
        /// Numeric trip id
        trip_id: i64,
    },
    /// Accept a matched ride as a driver and follow it
    Accept {
        /// Driver id
        #[arg(long)]
        driver: String,
        /// Alphanumeric ride id
        #[arg(long)]
        ride: String,
    },
    /// End a trip, optionally recording where it ended
    End {
        /// Numeric trip id
        trip_id: i64,
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Report a driver's location
    Location {
        /// Driver id
        driver: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },
    /// List active rides
    Active {
        /// Keep refreshing the list until Ctrl+C
        #[arg(long)]
        watch: bool,
    },
}

impl Args {
    /// Polling interval override, if one was given
    pub fn interval(&self) -> Option<Duration> {
        self.interval_ms.map(Duration::from_millis)
    }

    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == Some(0) {
            return Err(anyhow::anyhow!("Polling interval must be positive"));
        }

        if self.request_timeout == 0 {
            return Err(anyhow::anyhow!("Request timeout must be positive"));
        }

        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                ));
            }
        }

        if LoggingMode::from_name(&self.log_mode).is_none() {
            return Err(anyhow::anyhow!(
                "Invalid log mode '{}'. Valid modes: silent, development, debug, json",
                self.log_mode
            ));
        }

        Ok(())
    }

    /// Logging mode selected by `--log-mode`
    pub fn logging_mode(&self) -> LoggingMode {
        LoggingMode::from_name(&self.log_mode).unwrap_or(LoggingMode::Development)
    }

    /// Tracker configuration derived from the arguments
    pub fn tracker_config(&self) -> TrackerConfig {
        let config = TrackerConfig::new().with_api(
            ApiConfig::new()
                .with_base_url(self.api_url.clone())
                .with_request_timeout(Duration::from_secs(self.request_timeout)),
        );
        match self.interval() {
            Some(interval) => config.with_interval(interval),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    init_logging_with_level(args.logging_mode(), &args.log_level.to_lowercase())
        .context("Failed to initialize logging")?;

    let (tracker, events) =
        RideTracker::new(args.tracker_config()).context("Failed to create ride tracker")?;
    info!("Using ride API at {}", tracker.client().base_url());

    run(args.command, tracker, events).await
}

async fn run(command: Command, tracker: RideTracker, events: UnboundedReceiver<TrackerEvent>) -> Result<()> {
    let client = tracker.client().clone();

    match command {
        Command::Ride { ride_id } => {
            tracker
                .track_ride(&ride_id)
                .with_context(|| format!("Failed to track ride {}", ride_id))?;
        }
        Command::Trip { trip_id } => {
            tracker
                .track_trip(trip_id)
                .with_context(|| format!("Failed to track trip {}", trip_id))?;
        }
        Command::Request {
            rider,
            pickup_lat,
            pickup_lng,
            dest_lat,
            dest_lng,
            tier,
            payment_method,
        } => {
            let request = RideRequest::new(
                rider,
                Location::new(pickup_lat, pickup_lng),
                Location::new(dest_lat, dest_lng),
            )
            .with_tier(tier)
            .with_payment_method(payment_method);

            let ride = tracker
                .request_ride(request)
                .await
                .context("Failed to request ride")?;
            println!("Ride created: {} ({})", ride.ride_id, ride.status);
        }
        Command::Pay { trip_id } => {
            let payment = tracker
                .pay(trip_id)
                .await
                .with_context(|| format!("Failed to pay for trip {}", trip_id))?;
            println!("Payment {} submitted ({})", payment.payment_id, payment.status);
        }
        Command::Accept { driver, ride } => {
            client
                .accept_ride(&driver, &ride)
                .await
                .with_context(|| format!("Driver {} could not accept ride {}", driver, ride))?;
            println!("Ride {} accepted by {}; the trip starts automatically", ride, driver);
            tracker
                .track_ride(&ride)
                .with_context(|| format!("Failed to track ride {}", ride))?;
        }
        Command::End { trip_id, lat, lng } => {
            let end = lat.zip(lng).map(|(lat, lng)| Location::new(lat, lng));
            let trip = client
                .end_trip(trip_id, end)
                .await
                .with_context(|| format!("Failed to end trip {}", trip_id))?;
            match trip.total_fare {
                Some(fare) => println!("Trip {} ended. Fare: {:.2}", trip.id, fare),
                None => println!("Trip {} ended ({})", trip.id, trip.status),
            }
            return Ok(());
        }
        Command::Location { driver, lat, lng } => {
            let updated = client
                .update_driver_location(&driver, Location::new(lat, lng))
                .await
                .with_context(|| format!("Failed to update location of {}", driver))?;
            println!("Driver {} is {} at ({}, {})", updated.driver_id, updated.status, lat, lng);
            return Ok(());
        }
        Command::Active { watch: true } => {
            tracker
                .watch_active_rides()
                .context("Failed to watch active rides")?;
        }
        Command::Active { watch: false } => {
            let rides = client.active_rides().await.context("Failed to list active rides")?;
            if rides.is_empty() {
                println!("No active rides");
            }
            for ride in rides {
                println!(
                    "{}  {}  driver: {}",
                    ride.ride_id,
                    ride.status,
                    ride.driver_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            return Ok(());
        }
    }

    follow(tracker, events).await
}

/// Print events until nothing is tracked any more or Ctrl+C is pressed.
async fn follow(tracker: RideTracker, mut events: UnboundedReceiver<TrackerEvent>) -> Result<()> {
    if tracker.active_count() == 0 {
        while let Ok(event) = events.try_recv() {
            println!("{}", event);
        }
        return Ok(());
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                println!("{}", event);
                if matches!(event, TrackerEvent::Finished { .. }) && tracker.active_count() == 0 {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; stopping");
                break;
            }
        }
    }

    tracker.stop().await;
    while let Ok(event) = events.try_recv() {
        println!("{}", event);
    }
    Ok(())
}
