//! `longpoll-http` polls an HTTP resource at a fixed interval and hands every
//! outcome to a response handler.
//!
//! - [`LongPollClient::new`] plus `with_*` setters configure a client
//! - [`LongPollClient::start`] spawns the tick loop on the current tokio runtime
//! - [`LongPollClient::stop`] halts it; [`LongPollClient::drain`] waits for
//!   requests still in flight
//!
//! Every tick issues its request in its own task, so ticks overlap when the
//! server is slower than the interval and handlers may complete out of order.

mod client;
mod error;
mod handler;
mod options;
mod tick;
mod transport;
mod types;

pub use client::LongPollClient;
pub use error::{BoxError, LongPollError};
pub use handler::{ResponseHandler, TickOutcome};
pub use options::{ClientOptions, DEFAULT_INTERVAL, MAX_INTERVAL};
pub use transport::{default_transport, ReqwestTransport, Transport};
pub use types::{PollerState, Response};

/// Re-exported for [`Transport`] implementors.
pub use async_trait::async_trait;
pub use reqwest::{Method, StatusCode};

pub type Result<T> = std::result::Result<T, LongPollError>;
