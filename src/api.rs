//! Page fetching with timeouts and exponential backoff retry logic.
//!
//! Every network read of the pipeline goes through the [`PageFetcher`]
//! trait so scrapers can be driven by real HTTP in production and by
//! in-memory fakes in tests.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: Core trait returning the raw bytes of a page
//! - [`HttpFetcher`]: `reqwest`-backed implementation with a request timeout
//! - [`RetryFetch`]: Decorator that adds retry logic to any `PageFetcher`
//!
//! # Retry Strategy
//!
//! - Configurable number of retries (2 by default)
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 10 seconds
//! - Random jitter (0-250ms) added so parallel catalog fetches don't retry in lockstep

use crate::config::FetchConfig;
use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Why a page could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, TLS or body read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Trait for async page retrieval.
///
/// Implementors return the undecoded body of the page at `url`.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Fetch the raw bytes of a page.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client whose requests time out after `config.timeout_secs`.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Page request returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body.to_vec())
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Number of retries after the first failed attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    /// Create a new retry wrapper around an existing [`PageFetcher`].
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(10),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            %url,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self
                        .base_delay
                        .saturating_mul(1u32 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the `reqwest` client used for page fetches and health probes.
pub fn build_client(config: &FetchConfig) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .timeout(StdDuration::from_secs(config.timeout_secs))
        .build()?)
}

/// Build the production fetcher: HTTP with timeout, wrapped in retries.
pub fn build_fetcher(config: &FetchConfig) -> Result<RetryFetch<HttpFetcher>, FetchError> {
    let http = HttpFetcher::new(config)?;
    Ok(RetryFetch::new(
        http,
        config.retries,
        StdDuration::from_millis(config.retry_base_delay_ms),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails a fixed number of times, then succeeds.
    struct FlakyFetcher {
        failures: usize,
        calls: AtomicUsize,
    }

    impl PageFetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(FetchError::Status(503))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let flaky = FlakyFetcher {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 2, StdDuration::from_millis(1));

        let body = fetcher.fetch("http://example.test/").await.unwrap();
        assert_eq!(body, b"ok");
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let flaky = FlakyFetcher {
            failures: 10,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 1, StdDuration::from_millis(1));

        let err = fetcher.fetch("http://example.test/").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_fetcher_unreachable_host() {
        let config = FetchConfig {
            timeout_secs: 2,
            retries: 0,
            retry_base_delay_ms: 1,
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn test_retry_debug_hides_inner() {
        let flaky = FlakyFetcher {
            failures: 0,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 3, StdDuration::from_secs(1));
        let dbg = format!("{:?}", fetcher);
        assert!(dbg.contains("max_retries: 3"));
    }
}
