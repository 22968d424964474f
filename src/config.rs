//! Configuration types for adept-artifacts

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Default `User-Agent` sent with every artifact request
pub const DEFAULT_USER_AGENT: &str = "AdeptDownloader/1.0-ALPHA";

/// Main configuration for [`ArtifactFetcher`](crate::ArtifactFetcher)
///
/// Every field has a default, so `Config::default()` works out of the box and
/// partial JSON documents deserialize.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root of the content-addressed store; entries live under `<cache_dir>/cache`
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Staging directory for in-flight downloads (None = process temp directory)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Maximum concurrent artifact fetches (default: 30)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// `User-Agent` header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Re-hash existing cache entries before handing them out (default: true)
    #[serde(default = "default_true")]
    pub verify_cache: bool,

    /// Per-request HTTP timeout (None = no timeout)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// Deadline for a whole batch download (default: 1 hour)
    #[serde(default = "default_batch_timeout", with = "duration_serde")]
    pub batch_timeout: Duration,

    /// Retry behavior for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            temp_dir: None,
            max_concurrent_fetches: default_max_concurrent(),
            user_agent: default_user_agent(),
            verify_cache: true,
            request_timeout: None,
            batch_timeout: default_batch_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Check settings that would make a batch unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("max_concurrent_fetches".to_string()),
            });
        }
        if self.batch_timeout.is_zero() {
            return Err(Error::Config {
                message: "batch_timeout must be greater than zero".to_string(),
                key: Some("batch_timeout".to_string()),
            });
        }
        Ok(())
    }

    /// Staging directory, created if missing
    ///
    /// Falls back to the process temp directory when none is configured.
    pub fn staging_dir(&self) -> Result<PathBuf> {
        let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config {
            message: format!("staging directory {} is unusable: {}", dir.display(), e),
            key: Some("temp_dir".to_string()),
        })?;
        Ok(dir)
    }
}

/// Retry configuration for transient failures
///
/// Delays are fixed rather than exponential: every retry waits `delay`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 5, so 6 attempts in total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before each retry (default: 500 ms)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub delay: Duration,

    /// Stretch each delay by a random 0-100% (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay: default_retry_delay(),
            jitter: false,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.adept")
}

fn default_max_concurrent() -> usize {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

// Durations are stored as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
