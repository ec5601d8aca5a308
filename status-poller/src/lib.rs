//! # status-poller
//!
//! A micro-crate for tracking the status of remote resources by polling.
//!
//! A [`StatusPoller`] runs one cooperative loop per resource identifier. Each
//! loop fetches the resource's state through a caller-supplied
//! [`StatusFetcher`], compares it with the last observed state, and reports
//! every distinct new state exactly once to a [`TransitionHandler`]. Polling
//! ends when a terminal state is observed, when the resource is confirmed gone,
//! or when the caller cancels the [`SubscriptionHandle`].
//!
//! ## Guarantees
//!
//! - At most one fetch per subscription is in flight. Ticks that elapse while a
//!   fetch is outstanding are not queued: one fires late when the fetch
//!   returns and the rest are skipped.
//! - Callbacks are dispatched in tick order and never after cancellation.
//! - Transient fetch failures are reported and polling continues at the same
//!   fixed interval. Panicking callbacks are contained per invocation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use status_poller::{fetch_fn, CallbackHandler, FetchOutcome, StatusPoller};
//! use std::time::Duration;
//!
//! let poller = StatusPoller::new();
//! let handle = poller.start(
//!     "RIDE-1",
//!     Duration::from_millis(2000),
//!     ["COMPLETED".to_string(), "CANCELLED".to_string()],
//!     fetch_fn(|id| async move { api.ride_status(id).await }),
//!     CallbackHandler::new().on_transition(|id, _previous, status| {
//!         println!("{id}: {status}");
//!     }),
//! )?;
//!
//! // later
//! handle.cancel();
//! ```

mod config;
mod error;
mod fetch;
mod handler;
mod poller;
mod subscription;
mod types;

pub use config::PollerConfig;
pub use error::{CallbackError, FetchError, PollerError, Result};
pub use fetch::{fetch_fn, FetchOutcome, FetchResult, FnFetcher, StatusFetcher};
pub use handler::{CallbackHandler, ChannelHandler, PollEvent, TransitionHandler};
pub use poller::{PollOptions, PollerStats, StatusPoller};
pub use subscription::{PollSubscription, SubscriptionHandle, SubscriptionStats};
pub use types::{PollState, RankFn, ResourceId, StopReason};
