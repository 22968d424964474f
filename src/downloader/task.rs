//! Single-artifact fetch task: cache lookup, transfer, verification and retry.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::ArtifactCache;
use crate::config::RetryConfig;
use crate::error::{Error, FetchError, Result};
use crate::progress::ProgressSink;
use crate::retry::fetch_with_retry;
use crate::source::ArtifactSource;
use crate::types::{Artifact, FetchOutcome, SourceLocation};

use super::{ArtifactFetcher, locate_entry};

/// Resolves one artifact to a verified cache entry
///
/// Each attempt first consults the cache and only touches the network on a
/// miss. Transient failures are retried with a fixed delay; integrity
/// failures and a location count other than one fail immediately.
pub struct ArtifactDownloader {
    artifact: Artifact,
    filename: String,
    staging: tempfile::TempPath,
    cache: ArtifactCache,
    source: Arc<dyn ArtifactSource>,
    progress: Arc<dyn ProgressSink>,
    retry: RetryConfig,
    verify: bool,
    cancel: CancellationToken,
}

impl ArtifactDownloader {
    /// Create a task staging its download in `staging`
    ///
    /// The staging file is removed when the task is dropped.
    pub fn new(
        fetcher: &ArtifactFetcher,
        artifact: Artifact,
        filename: impl Into<String>,
        staging: tempfile::TempPath,
    ) -> Self {
        Self {
            artifact,
            filename: filename.into(),
            staging,
            cache: fetcher.cache.clone(),
            source: Arc::clone(&fetcher.source),
            progress: Arc::clone(&fetcher.progress),
            retry: fetcher.config.retry.clone(),
            verify: fetcher.config.verify_cache,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the task when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run to a terminal outcome
    pub async fn run(self) -> FetchOutcome {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Fetch(FetchError::Cancelled)),
            result = self.resolve() => result,
        };

        match result {
            Ok((path, fetched)) => FetchOutcome::Success {
                artifact: self.artifact,
                filename: self.filename,
                path,
                fetched,
            },
            Err(error) => self.fail(error),
        }
    }

    /// Finish without running, reporting `error`
    pub(crate) fn fail(self, error: Error) -> FetchOutcome {
        FetchOutcome::Failure {
            artifact: self.artifact,
            filename: self.filename,
            error,
        }
    }

    async fn resolve(&self) -> Result<(PathBuf, bool)> {
        let location = self.single_location()?;
        fetch_with_retry(&self.retry, move |attempt| self.attempt(location, attempt)).await
    }

    fn single_location(&self) -> Result<&SourceLocation> {
        let mut locations = self.artifact.locations.iter();
        match (locations.next(), locations.next()) {
            (Some(location), None) => Ok(location),
            _ => Err(FetchError::UnsupportedLocationCount {
                digest: self.artifact.digest.clone(),
                count: self.artifact.locations.len(),
            }
            .into()),
        }
    }

    async fn attempt(&self, location: &SourceLocation, attempt: u32) -> Result<(PathBuf, bool)> {
        if let Some(path) = self.locate().await? {
            tracing::debug!(
                digest = %self.artifact.digest,
                filename = %self.filename,
                "Artifact already cached"
            );
            self.progress.update(self.artifact.size_kib());
            return Ok((path, false));
        }

        tracing::debug!(
            digest = %self.artifact.digest,
            location = %location,
            attempt = attempt + 1,
            "Fetching artifact"
        );
        let bytes = self.source.fetch(location, &self.staging).await?;
        tracing::debug!(digest = %self.artifact.digest, bytes = bytes, "Fetched artifact");

        let path = self.adopt().await?;
        self.progress.update(self.artifact.size_kib());
        Ok((path, true))
    }

    async fn locate(&self) -> Result<Option<PathBuf>> {
        locate_entry(&self.cache, &self.artifact.digest, &self.filename, self.verify).await
    }

    async fn adopt(&self) -> Result<PathBuf> {
        let cache = self.cache.clone();
        let digest = self.artifact.digest.clone();
        let filename = self.filename.clone();
        let staging = self.staging.to_path_buf();
        tokio::task::spawn_blocking(move || cache.adopt(&staging, &digest, &filename))
            .await
            .map_err(|e| Error::Internal(format!("cache adoption task failed: {}", e)))?
    }
}
