//! Client configuration.

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default gateway base URL for a local deployment.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Configuration for the dashboard client.
///
/// Defaults match the production deployment: 50-record population pages,
/// 15-row history pages, a 500 ms search debounce and a 30 s background
/// population poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway base URL; trailing slashes are tolerated.
    pub base_url: String,
    /// Records per population page, sent as the `limit` query parameter.
    pub page_size: u32,
    /// Rows per client-side history page.
    pub history_page_size: usize,
    /// Quiet period after the last filter edit before a population fetch
    /// fires.
    pub debounce: Duration,
    /// Cadence of the background population refresh.
    pub poll_interval: Duration,
    /// Cadence of the dashboard stats refresh.
    pub stats_poll_interval: Duration,
    /// Transport-level request timeout; `None` leaves the transport
    /// default in place.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 50,
            history_page_size: 15,
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_secs(30),
            stats_poll_interval: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration pointing at `base_url`, defaults elsewhere.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the population page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the client-side history page size.
    #[must_use]
    pub fn with_history_page_size(mut self, page_size: usize) -> Self {
        self.history_page_size = page_size;
        self
    }

    /// Sets the filter-edit debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the background population poll cadence.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the dashboard stats poll cadence.
    #[must_use]
    pub fn with_stats_poll_interval(mut self, interval: Duration) -> Self {
        self.stats_poll_interval = interval;
        self
    }

    /// Sets the transport-level request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the base URL is not an
    /// HTTP(S) URL, a page size is zero, or a timer duration is zero.
    pub fn validate(&self) -> ClientResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Configuration(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.page_size == 0 {
            return Err(ClientError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.history_page_size == 0 {
            return Err(ClientError::Configuration(
                "history_page_size must be at least 1".to_string(),
            ));
        }
        if self.debounce.is_zero() {
            return Err(ClientError::Configuration(
                "debounce must be non-zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() || self.stats_poll_interval.is_zero() {
            return Err(ClientError::Configuration(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
