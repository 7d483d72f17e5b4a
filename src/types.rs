use std::fmt;

use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode, Url, Version};

use crate::{LongPollError, Result};

/// Lifecycle state of a [`LongPollClient`](crate::LongPollClient).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollerState {
    Idle,
    Running,
    /// Terminal; a stopped client cannot be restarted.
    Stopped,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// Response delivered to the handler for a successful tick.
///
/// Handlers only ever borrow it: the body is released as soon as the
/// handler returns, so anything worth keeping must be read before that.
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Length of the body as announced by the server, if known.
    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    /// Reads the next chunk of the body, `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.chunk().await.map_err(LongPollError::Transport)
    }

    /// Reads the remainder of the body.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let Some(first) = self.chunk().await? else {
            return Ok(Bytes::new());
        };
        let Some(second) = self.chunk().await? else {
            return Ok(first);
        };

        let mut buf = Vec::with_capacity(first.len() + second.len());
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    /// Reads the remainder of the body as text, replacing invalid UTF-8.
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl From<reqwest::Response> for Response {
    fn from(inner: reqwest::Response) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", self.url())
            .field("status", &self.status())
            .field("headers", self.headers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{PollerState, Response};

    fn response(body: &'static str) -> Response {
        let http = http::Response::builder()
            .status(202)
            .header("x-poll", "1")
            .body(body)
            .expect("response must build");
        Response::from(reqwest::Response::from(http))
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(PollerState::Running.to_string(), "running");
        assert_eq!(PollerState::Stopped.to_string(), "stopped");
    }

    #[tokio::test]
    async fn text_reads_full_body() {
        let mut response = response("hello poller");
        assert_eq!(response.status().as_u16(), 202);
        assert_eq!(response.headers()["x-poll"], "1");
        assert_eq!(response.text().await.expect("body"), "hello poller");
    }

    #[tokio::test]
    async fn body_is_empty_once_consumed() {
        let mut response = response("once");
        assert_eq!(&response.bytes().await.expect("body")[..], b"once");
        assert!(response.chunk().await.expect("chunk").is_none());
        assert!(response.bytes().await.expect("body").is_empty());
    }
}
