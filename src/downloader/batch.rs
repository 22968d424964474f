//! Batch orchestration: cache partition, bounded fan-out, deadline and report.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, FetchError, Result};
use crate::types::{Artifact, DownloadReport, FetchOutcome, RequiredArtifact};

use super::{ArtifactDownloader, ArtifactFetcher, locate_entry, staging_file_in};

/// Progress task label for a batch download
pub const PROGRESS_LABEL: &str = "Downloading (kB)";

impl ArtifactFetcher {
    /// Make every artifact available in the cache
    ///
    /// Artifacts with a verified cache entry succeed without network access.
    /// The rest are fetched concurrently, at most `max_concurrent_fetches` at a
    /// time, under a single `batch_timeout` deadline. Individual failures are
    /// logged and reported as [`FetchOutcome::Failure`]; the report always has
    /// one outcome per requested artifact.
    ///
    /// Cache lookups run concurrently under the same limit as fetches.
    ///
    /// # Errors
    ///
    /// Only batch-level problems are returned: an unusable staging directory
    /// or a lookup or fetch task that panicked.
    pub async fn download<'a, I>(&self, artifacts: I) -> Result<DownloadReport>
    where
        I: IntoIterator<Item = &'a RequiredArtifact>,
    {
        let mut report = DownloadReport::default();
        let mut pending: Vec<(Artifact, String)> = Vec::new();
        let limit = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));

        let mut lookups = JoinSet::new();
        for required in artifacts {
            let artifact = required.artifact.clone();
            let filename = required.cache_filename().to_string();
            let cache = self.cache.clone();
            let verify = self.config.verify_cache;
            let limit = Arc::clone(&limit);
            lookups.spawn(async move {
                let found = match limit.acquire_owned().await {
                    Ok(_permit) => locate_entry(&cache, &artifact.digest, &filename, verify).await,
                    Err(_) => Err(Error::Internal("cache lookup pool closed".to_string())),
                };
                (artifact, filename, found)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            let (artifact, filename, found) = joined
                .map_err(|e| Error::Internal(format!("cache lookup did not finish: {}", e)))?;
            match found {
                Ok(Some(path)) => report.outcomes.push(FetchOutcome::Success {
                    artifact,
                    filename,
                    path,
                    fetched: false,
                }),
                Ok(None) => pending.push((artifact, filename)),
                Err(error) => record_failure(&mut report, artifact, filename, error),
            }
        }

        let cached = report.outcomes.len();
        if pending.is_empty() {
            tracing::info!(cached = cached, "All artifacts available locally");
            return Ok(report);
        }

        let staging_dir = self.config.staging_dir()?;
        let cancel = CancellationToken::new();
        let mut downloaders = Vec::with_capacity(pending.len());
        let mut total_kib = 0u64;
        for (artifact, filename) in pending {
            match staging_file_in(&staging_dir) {
                Ok(staging) => {
                    total_kib += artifact.size_kib();
                    downloaders.push(
                        ArtifactDownloader::new(self, artifact, filename, staging)
                            .with_cancellation(cancel.clone()),
                    );
                }
                Err(error) => record_failure(&mut report, artifact, filename, error),
            }
        }
        if downloaders.is_empty() {
            return Ok(report);
        }

        tracing::info!(
            cached = cached,
            fetching = downloaders.len(),
            total_kib = total_kib,
            "Fetching artifacts"
        );
        self.progress.begin_task(PROGRESS_LABEL, total_kib);

        let deadline = tokio::time::Instant::now() + self.config.batch_timeout;
        let mut tasks = JoinSet::new();
        for downloader in downloaders {
            let limit = Arc::clone(&limit);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = limit.acquire_owned() => permit.ok(),
                };
                match permit {
                    Some(_permit) => downloader.run().await,
                    None => downloader.fail(Error::Fetch(FetchError::Cancelled)),
                }
            });
        }

        let mut expired = false;
        loop {
            let joined = if expired {
                tasks.join_next().await
            } else {
                match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = self.config.batch_timeout.as_millis() as u64,
                            remaining = tasks.len(),
                            "Batch deadline reached, cancelling remaining fetches"
                        );
                        cancel.cancel();
                        expired = true;
                        continue;
                    }
                }
            };

            let Some(joined) = joined else { break };
            match joined {
                Ok(outcome) => {
                    if !outcome.is_success() {
                        log_failure(&outcome);
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    cancel.cancel();
                    tasks.abort_all();
                    self.progress.end_task();
                    return Err(Error::Internal(format!("fetch task did not finish: {}", e)));
                }
            }
        }

        self.progress.end_task();

        let failed = report.failures().count();
        tracing::info!(
            total = report.len(),
            succeeded = report.len() - failed,
            failed = failed,
            "Artifact batch finished"
        );
        Ok(report)
    }
}

fn record_failure(report: &mut DownloadReport, artifact: Artifact, filename: String, error: Error) {
    let outcome = FetchOutcome::Failure {
        artifact,
        filename,
        error,
    };
    log_failure(&outcome);
    report.outcomes.push(outcome);
}

fn log_failure(outcome: &FetchOutcome) {
    if let FetchOutcome::Failure {
        artifact,
        filename,
        error,
    } = outcome
    {
        tracing::error!(
            filename = %filename,
            locations = %artifact.locations_joined(),
            error = %error,
            cause = ?error.cause().map(|c| c.to_string()),
            digest = %artifact.digest,
            "Failed to get artifact"
        );
    }
}
