use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;

use crate::{LongPollError, Response, Result};

/// Performs the actual network request for a tick.
///
/// One transport may be shared by many clients and is called concurrently
/// from overlapping ticks, hence the `Send + Sync` bound.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<Response>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a preconfigured client (proxies, TLS roots, default headers...).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<Response> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(LongPollError::Transport)?;
        Ok(Response::from(response))
    }
}

/// Returns the process-wide transport installed when none is configured.
pub fn default_transport() -> Arc<dyn Transport> {
    static DEFAULT: OnceLock<Arc<ReqwestTransport>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(ReqwestTransport::new())).clone()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::default_transport;

    #[test]
    fn default_transport_is_shared() {
        let first = default_transport();
        let second = default_transport();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
