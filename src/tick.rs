use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use reqwest::Method;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{LongPollError, Response, ResponseHandler, Result, Transport};

/// Settings a running loop reads; frozen when the client starts.
#[derive(Clone)]
pub(crate) struct PollConfig {
    pub(crate) resource: String,
    pub(crate) method: String,
    pub(crate) interval: Duration,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) handler: Option<Arc<dyn ResponseHandler>>,
}

impl PollConfig {
    /// Builds and sends one request for the configured resource.
    async fn fetch(&self) -> Result<Response> {
        let method = parse_method(&self.method)?;
        let request = self.transport.execute(method, &self.resource, None);

        match self.request_timeout {
            Some(limit) => time::timeout(limit, request)
                .await
                .map_err(|_| LongPollError::Timeout(limit))?,
            None => request.await,
        }
    }
}

/// The background half of a running client.
pub(crate) struct TickLoop {
    pub(crate) config: Arc<PollConfig>,
    pub(crate) cancel: CancellationToken,
    pub(crate) in_flight: TaskTracker,
    pub(crate) dispatched: Arc<AtomicU64>,
}

impl TickLoop {
    /// Fires a tick every period starting at `first_tick` until cancelled.
    ///
    /// Cancellation is checked first so that no tick is dispatched once the
    /// token has been observed, even if the timer is also ready.
    pub(crate) async fn run(self, first_tick: Instant) {
        let mut ticker = time::interval_at(first_tick, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.dispatch(),
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource = %self.config.resource,
            ticks = self.dispatched.load(Ordering::SeqCst),
            "poll loop exited"
        );
    }

    fn dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);

        // Nowhere to deliver the outcome, so don't spend a request on it.
        let Some(handler) = self.config.handler.clone() else {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                tick = self.dispatched.load(Ordering::SeqCst),
                "no response handler configured, skipping request"
            );
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(
            tick = self.dispatched.load(Ordering::SeqCst),
            resource = %self.config.resource,
            "dispatching poll request"
        );

        let config = Arc::clone(&self.config);
        self.in_flight.spawn(run_tick(config, handler));
    }
}

async fn run_tick(config: Arc<PollConfig>, handler: Arc<dyn ResponseHandler>) {
    match config.fetch().await {
        Ok(mut response) => {
            handler.handle(Ok(&mut response)).await;
            // Body is released here, after the handler is done with it.
            drop(response);
        }
        Err(err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(resource = %config.resource, error = %err, "poll request failed");
            handler.handle(Err(err)).await;
        }
    }
}

/// Empty means `GET`; anything else must be a valid method token.
fn parse_method(raw: &str) -> Result<Method> {
    if raw.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(raw.as_bytes()).map_err(|_| LongPollError::InvalidMethod(raw.to_owned()))
}
