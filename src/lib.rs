//! # adept-artifacts
//!
//! Artifact fetching layer for the adept dependency manager.
//!
//! ## Design Philosophy
//!
//! adept-artifacts is designed to be:
//! - **Content-addressed** - Artifacts are identified by their SHA-256 digest and
//!   verified before they are ever handed out
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Partial-failure tolerant** - One bad artifact never aborts a batch
//!
//! ## Quick Start
//!
//! ```no_run
//! use adept_artifacts::{ArtifactFetcher, Config, Lockfile};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         cache_dir: "/var/cache/adept".into(),
//!         ..Default::default()
//!     };
//!     let fetcher = ArtifactFetcher::new(config)?;
//!
//!     let lockfile = Lockfile::read(Path::new("adept.lock"))?;
//!     let report = lockfile.download(&fetcher).await?;
//!
//!     for outcome in report.failures() {
//!         eprintln!("failed: {}", outcome.filename());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Content-addressed artifact store
pub mod cache;
/// Configuration types
pub mod config;
/// Single-artifact and batch fetching
pub mod downloader;
/// Error types
pub mod error;
/// SHA-256 content digests
pub mod hash;
/// Lockfile artifacts section
pub mod lockfile;
/// Progress reporting
pub mod progress;
/// Retry logic with a fixed delay
pub mod retry;
/// Byte sources (HTTP, local files)
pub mod source;
/// Core types
pub mod types;

// Re-export commonly used types
pub use cache::ArtifactCache;
pub use config::{Config, RetryConfig};
pub use downloader::{ArtifactDownloader, ArtifactFetcher, PROGRESS_LABEL};
pub use error::{CacheError, Error, FetchError, Result};
pub use lockfile::Lockfile;
pub use progress::{NoProgress, ProgressCounter, ProgressSink, TracingProgress};
pub use source::{ArtifactSource, HttpSource};
pub use types::{
    Artifact, ArtifactAttribute, ContentDigest, DownloadReport, FetchOutcome, RequiredArtifact,
    SourceLocation,
};
