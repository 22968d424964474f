//! Retry logic with a fixed delay
//!
//! Transient failures are retried up to a configured budget, waiting the same
//! delay before every retry. The wait is a `tokio::time::sleep`, so a retrying
//! fetch never pins a worker thread.
//!
//! # Example
//!
//! ```no_run
//! use adept_artifacts::retry::{IsRetryable, fetch_with_retry};
//! use adept_artifacts::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! fetch_with_retry(&config, |_attempt| async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{CacheError, Error, FetchError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connection reset, timeouts, server busy) return `true`.
/// Permanent failures (digest mismatch, bad configuration, cancellation) return `false`.
///
/// For [`Error`], HTTP statuses count as transient only for 5xx, 408 and 429.
/// Any other 4xx, such as a 404 for a missing artifact, fails on the first
/// attempt without using the retry budget.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport failures of any kind are worth another attempt
            Error::Network(_) => true,
            Error::Io(_) => true,
            Error::Fetch(FetchError::HttpStatus { status, .. }) => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Error::Fetch(FetchError::UnsupportedLocationCount { .. })
            | Error::Fetch(FetchError::InvalidLocation { .. })
            | Error::Fetch(FetchError::Cancelled) => false,
            // Shard directory creation is filesystem I/O
            Error::Cache(CacheError::CreateDir { .. }) => true,
            // Corrupt cache or wrong manifest; retrying cannot help
            Error::Cache(_) => false,
            Error::Config { .. } => false,
            Error::Lockfile(_) => false,
            Error::Internal(_) => false,
        }
    }
}

/// Execute an async operation, retrying transient failures with a fixed delay
///
/// `operation` receives the zero-based attempt number. At most
/// `config.max_retries + 1` attempts are made; the last error is returned once
/// the budget is exhausted, and non-retryable errors are returned immediately.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;

                let delay = if config.jitter {
                    add_jitter(config.delay)
                } else {
                    config.delay
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
