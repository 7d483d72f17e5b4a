use std::fmt;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    handler::FnHandler,
    options::normalize_interval,
    tick::{PollConfig, TickLoop},
    transport::default_transport,
    ClientOptions, LongPollError, PollerState, ResponseHandler, Result, TickOutcome, Transport,
    DEFAULT_INTERVAL,
};

const ENV_RESOURCE: &str = "LONGPOLL_RESOURCE";
const ENV_INTERVAL_MS: &str = "LONGPOLL_INTERVAL_MS";
const ENV_REQUEST_TIMEOUT_MS: &str = "LONGPOLL_REQUEST_TIMEOUT_MS";
const ENV_METHOD: &str = "LONGPOLL_METHOD";

/// Polls one HTTP resource at a fixed interval and hands every outcome to a
/// response handler.
///
/// Each tick runs as its own task; a slow request never delays the next
/// tick, and the handler may run concurrently with itself. Dropping the
/// client cancels its loop the same way [`LongPollClient::stop`] does.
pub struct LongPollClient {
    config: PollConfig,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
    in_flight: TaskTracker,
    dispatched: Arc<AtomicU64>,
}

struct Lifecycle {
    state: PollerState,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for LongPollClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongPollClient")
            .field("resource", &self.config.resource)
            .field("method", &self.config.method)
            .field("interval", &self.config.interval)
            .field("request_timeout", &self.config.request_timeout)
            .field("handler", &self.config.handler.is_some())
            .field("state", &self.state())
            .finish()
    }
}

impl LongPollClient {
    /// Creates an idle client for `resource` with default settings.
    ///
    /// The resource is not validated here; an unusable URL shows up as an
    /// error delivered to the handler on every tick.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            config: PollConfig {
                resource: resource.into(),
                method: String::new(),
                interval: DEFAULT_INTERVAL,
                request_timeout: None,
                transport: default_transport(),
                handler: None,
            },
            lifecycle: Mutex::new(Lifecycle {
                state: PollerState::Idle,
                task: None,
            }),
            cancel: CancellationToken::new(),
            in_flight: TaskTracker::new(),
            dispatched: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `LONGPOLL_RESOURCE`: URL to poll (required)
    /// - `LONGPOLL_INTERVAL_MS`: tick period in milliseconds
    /// - `LONGPOLL_REQUEST_TIMEOUT_MS`: per-request deadline in milliseconds
    /// - `LONGPOLL_METHOD`: HTTP method, `GET` when unset
    ///
    /// # Example
    ///
    /// ```no_run
    /// use longpoll_http::LongPollClient;
    ///
    /// let poller = LongPollClient::from_env().expect("missing LONGPOLL_RESOURCE");
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let resource = lookup(ENV_RESOURCE).ok_or_else(|| {
            LongPollError::Config(format!("missing {ENV_RESOURCE} environment variable"))
        })?;
        if resource.trim().is_empty() {
            return Err(LongPollError::Config(format!(
                "{ENV_RESOURCE} is set but empty"
            )));
        }

        let defaults = ClientOptions::default();
        let options = ClientOptions {
            interval_ms: parse_millis(&lookup, ENV_INTERVAL_MS)?.unwrap_or(defaults.interval_ms),
            request_timeout_ms: parse_millis(&lookup, ENV_REQUEST_TIMEOUT_MS)?,
            method: lookup(ENV_METHOD)
                .map(|method| method.trim().to_owned())
                .unwrap_or(defaults.method),
        };

        Ok(Self::new(resource.trim()).with_options(options))
    }

    /// Applies interval, request timeout and method from `opts`.
    ///
    /// All three fields are overwritten, including a `None` request timeout.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.config.interval = opts.interval();
        self.config.request_timeout = opts.request_timeout();
        self.config.method = opts.method;
        self
    }

    /// Sets the tick period. Zero restores the 5 second default; periods
    /// above [`MAX_INTERVAL`](crate::MAX_INTERVAL) are clamped to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = normalize_interval(interval);
        self
    }

    /// Alias of [`LongPollClient::with_interval`].
    ///
    /// This sets how often requests are sent, not how long one may take; see
    /// [`LongPollClient::with_request_timeout`] for that.
    pub fn with_timeout(self, interval: Duration) -> Self {
        self.with_interval(interval)
    }

    /// Fails a tick with [`LongPollError::Timeout`] when its request takes
    /// longer than `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Replaces the default transport. The same transport may be shared by
    /// several clients.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = transport;
        self
    }

    /// Sets the HTTP method sent on every tick. Validated per tick; an
    /// invalid method reaches the handler as [`LongPollError::InvalidMethod`].
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.config.method = method.into();
        self
    }

    /// Sets an async response handler.
    pub fn with_response_handler<H: ResponseHandler>(mut self, handler: H) -> Self {
        self.config.handler = Some(Arc::new(handler));
        self
    }

    /// Sets a synchronous closure as the response handler.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use longpoll_http::LongPollClient;
    ///
    /// let poller = LongPollClient::new("https://example.com/").on_response(|outcome| {
    ///     match outcome {
    ///         Ok(response) => println!("{}", response.status()),
    ///         Err(err) => eprintln!("poll failed: {err}"),
    ///     }
    /// });
    /// ```
    pub fn on_response<F>(self, handler: F) -> Self
    where
        F: Fn(TickOutcome<'_>) + Send + Sync + 'static,
    {
        self.with_response_handler(FnHandler(handler))
    }

    pub fn resource(&self) -> &str {
        &self.config.resource
    }

    pub fn method(&self) -> &str {
        &self.config.method
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.config.request_timeout
    }

    pub fn state(&self) -> PollerState {
        self.lifecycle().state
    }

    /// Number of timer ticks fired so far, including ticks skipped for lack
    /// of a handler.
    pub fn ticks_dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Number of ticks whose request or handler has not finished yet.
    ///
    /// Nothing bounds this: a transport slower than the interval makes it
    /// grow without limit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts polling on the current tokio runtime and returns immediately.
    ///
    /// The first request goes out one interval after this call. Fails with
    /// [`LongPollError::InvalidTransition`] unless the client is idle, and
    /// with [`LongPollError::NoRuntime`] outside a runtime.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != PollerState::Idle {
            return Err(LongPollError::transition("start", lifecycle.state));
        }
        let runtime = Handle::try_current().map_err(|_| LongPollError::NoRuntime)?;
        let first_tick = Instant::now()
            .checked_add(self.config.interval)
            .ok_or_else(|| {
                LongPollError::Config(format!(
                    "interval {:?} is too far in the future",
                    self.config.interval
                ))
            })?;

        let tick_loop = TickLoop {
            config: Arc::new(self.config.clone()),
            cancel: self.cancel.clone(),
            in_flight: self.in_flight.clone(),
            dispatched: Arc::clone(&self.dispatched),
        };
        lifecycle.task = Some(runtime.spawn(tick_loop.run(first_tick)));
        lifecycle.state = PollerState::Running;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource = %self.config.resource,
            interval_ms = self.config.interval.as_millis() as u64,
            "poller started"
        );
        Ok(())
    }

    /// Stops dispatching new ticks.
    ///
    /// Requests already in flight are not cancelled; their handler still runs
    /// once they complete, possibly after this returns. Use
    /// [`LongPollClient::drain`] to wait for them. Fails with
    /// [`LongPollError::InvalidTransition`] unless the client is running.
    pub fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != PollerState::Running {
            return Err(LongPollError::transition("stop", lifecycle.state));
        }
        lifecycle.state = PollerState::Stopped;
        self.cancel.cancel();
        self.in_flight.close();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            resource = %self.config.resource,
            in_flight = self.in_flight.len(),
            "poller stopped"
        );
        Ok(())
    }

    /// Waits for the loop to exit and for every in-flight tick to finish.
    ///
    /// Only valid on a stopped client.
    pub async fn drain(&self) -> Result<()> {
        let task = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != PollerState::Stopped {
                return Err(LongPollError::transition("drain", lifecycle.state));
            }
            lifecycle.task.take()
        };

        if let Some(task) = task {
            // The loop never panics; a join error can only mean runtime shutdown.
            let _ = task.await;
        }
        self.in_flight.wait().await;
        Ok(())
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LongPollClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|err| LongPollError::Config(format!("{key} must be milliseconds: {err}")))
}
