use std::time::Duration;

use serde::Deserialize;

/// Interval installed when none (or zero) is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Longest accepted interval (30 years); longer ones are clamped to it.
pub const MAX_INTERVAL: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Configures polling cadence, request deadline and HTTP method.
///
/// Deserializable from any serde format; missing fields take their defaults.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Tick period in milliseconds. Zero falls back to [`DEFAULT_INTERVAL`].
    pub interval_ms: u64,
    /// Optional per-request deadline in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// HTTP method sent on every tick. Empty means `GET`.
    pub method: String,
}

impl ClientOptions {
    /// Tick period; zero falls back to [`DEFAULT_INTERVAL`], anything above
    /// [`MAX_INTERVAL`] is clamped.
    pub fn interval(&self) -> Duration {
        normalize_interval(Duration::from_millis(self.interval_ms))
    }

    /// Per-request deadline, `None` when unset.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            request_timeout_ms: None,
            method: String::new(),
        }
    }
}

pub(crate) fn normalize_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_INTERVAL
    } else {
        interval.min(MAX_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ClientOptions, DEFAULT_INTERVAL, MAX_INTERVAL};

    #[test]
    fn defaults_match_documented_values() {
        let options = ClientOptions::default();
        assert_eq!(options.interval(), DEFAULT_INTERVAL);
        assert_eq!(options.request_timeout(), None);
        assert!(options.method.is_empty());
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let options = ClientOptions {
            interval_ms: 0,
            ..ClientOptions::default()
        };
        assert_eq!(options.interval(), Duration::from_secs(5));
    }

    #[test]
    fn oversized_interval_is_clamped() {
        let options = ClientOptions {
            interval_ms: u64::MAX,
            ..ClientOptions::default()
        };
        assert_eq!(options.interval(), MAX_INTERVAL);
    }

    #[test]
    fn deserializes_partial_documents() {
        let options: ClientOptions =
            serde_json::from_str(r#"{ "interval_ms": 250, "method": "HEAD" }"#)
                .expect("options must deserialize");
        assert_eq!(options.interval(), Duration::from_millis(250));
        assert_eq!(options.method, "HEAD");
        assert_eq!(options.request_timeout_ms, None);
    }
}
