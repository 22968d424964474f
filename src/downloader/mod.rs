//! Artifact fetching, split into focused submodules.
//!
//! - [`task`] - One artifact: cache lookup, transfer, verification, retry
//! - [`batch`] - Many artifacts: cache partition, bounded fan-out, deadline, report

mod batch;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::PROGRESS_LABEL;
pub use task::ArtifactDownloader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ArtifactCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::{NoProgress, ProgressSink};
use crate::source::{ArtifactSource, HttpSource};
use crate::types::{Artifact, ContentDigest, FetchOutcome};

/// Prefix of staging files created in the temp directory
const STAGING_PREFIX: &str = "adept-";

/// Resolves artifacts into the local content-addressed cache
///
/// Cloneable; all shared state is Arc-wrapped.
#[derive(Clone)]
pub struct ArtifactFetcher {
    pub(crate) config: Arc<Config>,
    pub(crate) cache: ArtifactCache,
    pub(crate) source: Arc<dyn ArtifactSource>,
    pub(crate) progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ArtifactFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactFetcher")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ArtifactFetcher {
    /// Create a fetcher that downloads over HTTP
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let source = Arc::new(HttpSource::new(&config)?);
        Self::with_source(config, source)
    }

    /// Create a fetcher with a custom byte source
    pub fn with_source(config: Config, source: Arc<dyn ArtifactSource>) -> Result<Self> {
        config.validate()?;
        let cache = ArtifactCache::new(config.cache_dir.clone());
        tracing::debug!(
            cache_root = %cache.root().display(),
            max_concurrent = config.max_concurrent_fetches,
            "Artifact fetcher ready"
        );
        Ok(Self {
            cache,
            config: Arc::new(config),
            source,
            progress: Arc::new(NoProgress),
        })
    }

    /// Report progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// The content store this fetcher adopts into
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a single artifact, failing instead of returning an outcome
    ///
    /// # Errors
    ///
    /// Returns the task's final error: an unsupported location count, an
    /// integrity violation, or the last transient error once retries run out.
    pub async fn download_artifact(&self, artifact: &Artifact, filename: &str) -> Result<PathBuf> {
        let staging = self.staging_file()?;
        match ArtifactDownloader::new(self, artifact.clone(), filename, staging)
            .run()
            .await
        {
            FetchOutcome::Success { path, .. } => Ok(path),
            FetchOutcome::Failure { error, .. } => Err(error),
        }
    }

    /// Allocate a staging file in the configured temp directory
    pub(crate) fn staging_file(&self) -> Result<tempfile::TempPath> {
        let dir = self.config.staging_dir()?;
        staging_file_in(&dir)
    }
}

/// Run [`ArtifactCache::locate`] on the blocking pool
pub(crate) async fn locate_entry(
    cache: &ArtifactCache,
    digest: &ContentDigest,
    filename: &str,
    verify: bool,
) -> Result<Option<PathBuf>> {
    let cache = cache.clone();
    let digest = digest.clone();
    let filename = filename.to_string();
    tokio::task::spawn_blocking(move || cache.locate(&digest, &filename, verify))
        .await
        .map_err(|e| Error::Internal(format!("cache lookup task failed: {}", e)))?
}

/// Allocate a staging file in `dir`, removed when the returned path is dropped
///
/// The name carries no part of the artifact filename, so any filename the
/// cache accepts can be staged.
pub(crate) fn staging_file_in(dir: &Path) -> Result<tempfile::TempPath> {
    let file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("cannot create staging file in {}: {}", dir.display(), e),
            ))
        })?;
    Ok(file.into_temp_path())
}
