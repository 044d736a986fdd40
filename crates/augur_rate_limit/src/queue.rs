//! FIFO dispatch queue with a minimum inter-dispatch delay.
//!
//! The upstream limit is "no more than one call every N ms", not a burst or
//! window quota, so a single FIFO is enough: no token bucket, no semaphore.
//!
//! Callers take a ticket and wait for it to be released. A drainer task, alive
//! only while tickets are pending, releases them one at a time. A released
//! caller reports the instant its operation actually starts, and that instant,
//! not the release, is the watermark the next release is spaced from. A caller
//! that is slow to be scheduled after release therefore pushes the next start
//! back instead of shrinking the gap. Gating is on the *start* of each
//! operation; a slow or hung call never holds up the tickets behind it.

use crate::ThrottleConfig;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

/// Released to a waiting caller, who answers with its start instant.
type Ticket = oneshot::Sender<oneshot::Sender<Instant>>;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Ticket>,
    draining: bool,
    last_dispatch: Option<Instant>,
    dispatched: u64,
}

/// Serializes operations and spaces their starts at least `min_delay` apart.
///
/// Cloning is cheap; clones share the same queue and watermark.
///
/// # Example
///
/// ```
/// use augur_rate_limit::RequestQueue;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = RequestQueue::new(Duration::from_millis(10));
/// let first = queue.run(|| async { 1 }).await;
/// let second = queue.run(|| async { 2 }).await;
/// assert_eq!(first + second, 3);
/// assert_eq!(queue.dispatched(), 2);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestQueue {
    min_delay: Duration,
    state: Arc<Mutex<QueueState>>,
}

impl RequestQueue {
    /// Create a queue enforcing `min_delay` between dispatch starts.
    pub fn new(min_delay: Duration) -> Self {
        debug!(min_delay_ms = min_delay.as_millis() as u64, "Creating request queue");
        Self {
            min_delay,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Create a queue from configuration.
    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.min_delay())
    }

    /// Minimum spacing between dispatch starts.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Tickets waiting for release.
    pub fn pending(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Operations released so far.
    pub fn dispatched(&self) -> u64 {
        lock(&self.state).dispatched
    }

    /// Start time of the most recently started operation.
    pub fn last_dispatch(&self) -> Option<Instant> {
        lock(&self.state).last_dispatch
    }

    /// Wait for this caller's turn, then run `operation`.
    ///
    /// The operation's result, success or failure, is returned unchanged; it
    /// has no effect on the queue.
    pub async fn run<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }

    #[instrument(skip(self), fields(min_delay_ms = self.min_delay.as_millis() as u64))]
    async fn acquire(&self) {
        let (ticket, released) = oneshot::channel();

        let start_drainer = {
            let mut state = lock(&self.state);
            state.pending.push_back(ticket);
            trace!(pending = state.pending.len(), "Ticket queued");
            !std::mem::replace(&mut state.draining, true)
        };

        if start_drainer {
            tokio::spawn(drain(self.min_delay, Arc::clone(&self.state)));
        }

        // The drainer only drops a ticket after releasing it, so an error here
        // means the runtime is shutting down; proceed rather than hang.
        if let Ok(started) = released.await {
            let now = Instant::now();
            trace!(?now, "Ticket released");
            let _ = started.send(now);
        }
    }
}

async fn drain(min_delay: Duration, state: Arc<Mutex<QueueState>>) {
    loop {
        let (ticket, wait) = {
            let mut guard = lock(&state);
            let Some(ticket) = guard.pending.pop_front() else {
                guard.draining = false;
                return;
            };
            (ticket, wait_from(guard.last_dispatch, min_delay))
        };

        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Throttling next dispatch");
            tokio::time::sleep(wait).await;
        }

        // Abandoned tickets don't consume a slot.
        let (started_tx, started_rx) = oneshot::channel();
        if ticket.send(started_tx).is_err() {
            trace!("Skipping abandoned ticket");
            continue;
        }

        match started_rx.await {
            Ok(started) => {
                let mut guard = lock(&state);
                guard.last_dispatch = Some(started);
                guard.dispatched += 1;
            }
            Err(_) => trace!("Released caller went away before starting"),
        }
    }
}

fn wait_from(last_dispatch: Option<Instant>, min_delay: Duration) -> Duration {
    last_dispatch
        .map(|last| (last + min_delay).saturating_duration_since(Instant::now()))
        .unwrap_or_default()
}

// Critical sections never panic, so a poisoned lock still holds consistent data.
fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
