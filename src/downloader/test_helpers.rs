//! Shared test helpers for building fetchers over scripted sources.

use crate::config::{Config, RetryConfig};
use crate::downloader::ArtifactFetcher;
use crate::error::{Error, Result};
use crate::hash::digest_bytes;
use crate::source::ArtifactSource;
use crate::types::{Artifact, SourceLocation};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// What a scripted source does on one call
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// Fail with a retryable I/O error
    Transient,
    /// Write these bytes
    Serve(Vec<u8>),
    /// Never complete
    Hang,
}

/// Source that replays a fixed script, one step per call, shared across clones
#[derive(Clone, Default)]
pub(crate) struct ScriptedSource {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of fetches made so far
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ArtifactSource for ScriptedSource {
    async fn fetch(&self, _location: &SourceLocation, dest: &Path) -> Result<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Transient) => Err(Error::Io(std::io::Error::other(format!(
                "transient failure #{call}"
            )))),
            Some(Step::Serve(bytes)) => {
                tokio::fs::write(dest, &bytes).await?;
                Ok(bytes.len() as u64)
            }
            Some(Step::Hang) => std::future::pending().await,
            None => Err(Error::Io(std::io::Error::other("script exhausted"))),
        }
    }
}

/// Source that dispatches each location to its own script
#[derive(Clone, Default)]
pub(crate) struct RoutingSource {
    routes: Arc<HashMap<String, ScriptedSource>>,
}

impl RoutingSource {
    pub(crate) fn new(routes: impl IntoIterator<Item = (&'static str, ScriptedSource)>) -> Self {
        Self {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(location, source)| (location.to_string(), source))
                    .collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactSource for RoutingSource {
    async fn fetch(&self, location: &SourceLocation, dest: &Path) -> Result<u64> {
        match self.routes.get(location.as_str()) {
            Some(source) => source.fetch(location, dest).await,
            None => Err(Error::Io(std::io::Error::other(format!("no route for {location}")))),
        }
    }
}

/// An artifact whose digest matches `bytes`, fetched from `location`
pub(crate) fn artifact_for(bytes: &[u8], location: &str) -> Artifact {
    Artifact::new(
        digest_bytes(bytes),
        bytes.len() as u64,
        [SourceLocation::from(location)],
    )
}

/// Test config rooted in `dir`
pub(crate) fn test_config(dir: &Path, max_retries: u32) -> Config {
    Config {
        cache_dir: dir.join("root"),
        temp_dir: Some(dir.join("tmp")),
        max_concurrent_fetches: 4,
        retry: RetryConfig {
            max_retries,
            delay: Duration::from_millis(500),
            jitter: false,
        },
        ..Default::default()
    }
}

/// Fetcher over `source` with its own temp dir (which must be kept alive)
pub(crate) fn fetcher_with(
    source: impl ArtifactSource + 'static,
    max_retries: u32,
) -> (ArtifactFetcher, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let fetcher =
        ArtifactFetcher::with_source(test_config(dir.path(), max_retries), Arc::new(source))
            .unwrap();
    (fetcher, dir)
}
