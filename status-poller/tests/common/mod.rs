//! Shared helpers for status-poller integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use status_poller::{FetchError, FetchOutcome, FetchResult, PollEvent, ResourceId, StatusFetcher};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Fetcher replaying a script of results.
///
/// Once the script runs out it keeps returning the last scripted result.
#[derive(Clone)]
pub struct ScriptedFetcher<S> {
    script: Arc<Mutex<VecDeque<FetchResult<S>>>>,
    last: Arc<Mutex<Option<FetchResult<S>>>>,
    calls: Arc<AtomicUsize>,
}

impl<S: Clone + Send + Sync + 'static> ScriptedFetcher<S> {
    pub fn new(script: Vec<FetchResult<S>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn states(states: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            states
                .into_iter()
                .map(|state| Ok(FetchOutcome::Found(state)))
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sleep in small steps until at least `n` fetches were issued.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> StatusFetcher<S> for ScriptedFetcher<S> {
    async fn fetch_status(&self, _resource_id: &ResourceId) -> FetchResult<S> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(result) => {
                *self.last.lock() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err(FetchError::Other("empty script".to_string()))),
        }
    }
}

/// Collect every event currently queued on the channel.
pub fn drain<S>(rx: &mut UnboundedReceiver<PollEvent<S>>) -> Vec<PollEvent<S>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// The states of all transition events, in order.
pub fn transition_states<S: Clone>(events: &[PollEvent<S>]) -> Vec<S> {
    events
        .iter()
        .filter_map(|event| match event {
            PollEvent::Transition { state, .. } => Some(state.clone()),
            _ => None,
        })
        .collect()
}
