use async_trait::async_trait;

use crate::{LongPollError, Response};

/// Outcome of a single tick: exactly one of a response or an error.
pub type TickOutcome<'a> = std::result::Result<&'a mut Response, LongPollError>;

/// Receives the outcome of every completed tick.
///
/// Invocations from overlapping ticks may run concurrently and complete in
/// any order. Shared state touched here must be synchronized by the
/// implementor.
#[async_trait]
pub trait ResponseHandler: Send + Sync + 'static {
    async fn handle(&self, outcome: TickOutcome<'_>);
}

/// Adapts a synchronous closure into a [`ResponseHandler`].
pub(crate) struct FnHandler<F>(pub(crate) F);

#[async_trait]
impl<F> ResponseHandler for FnHandler<F>
where
    F: Fn(TickOutcome<'_>) + Send + Sync + 'static,
{
    async fn handle(&self, outcome: TickOutcome<'_>) {
        (self.0)(outcome)
    }
}
