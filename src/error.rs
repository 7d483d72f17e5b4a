use std::time::Duration;

use crate::PollerState;

/// Boxed error produced by custom [`Transport`](crate::Transport) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
///
/// Request failures are never returned from lifecycle calls; they are handed
/// to the response handler of the tick that produced them.
#[derive(Debug, thiserror::Error)]
pub enum LongPollError {
    /// The configured HTTP method is not a valid method token.
    #[error("invalid http method '{0}'")]
    InvalidMethod(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The request did not complete within the configured request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Failure reported by a custom transport.
    #[error("transport error: {0}")]
    Other(BoxError),
    /// Lifecycle call made in a state that does not allow it.
    #[error("invalid state transition: cannot {operation} a poller that is {state}")]
    InvalidTransition {
        /// Name of the rejected lifecycle call.
        operation: &'static str,
        /// State the poller was in when the call was made.
        state: PollerState,
    },
    /// `start` was called outside of a tokio runtime.
    #[error("no tokio runtime available to drive the poller")]
    NoRuntime,
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
}

impl LongPollError {
    /// Wraps an arbitrary error raised by a custom transport.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    pub(crate) fn transition(operation: &'static str, state: PollerState) -> Self {
        Self::InvalidTransition { operation, state }
    }
}
