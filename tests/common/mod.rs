//! Common test utilities for adept-artifacts integration tests

#![allow(dead_code)]

use adept_artifacts::hash::digest_bytes;
use adept_artifacts::{Artifact, Config, RequiredArtifact, RetryConfig, SourceLocation};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config rooted in `dir` with short retry delays
pub fn test_config(dir: &Path) -> Config {
    Config {
        cache_dir: dir.join("adept"),
        temp_dir: Some(dir.join("tmp")),
        max_concurrent_fetches: 4,
        retry: RetryConfig {
            max_retries: 2,
            delay: Duration::from_millis(10),
            jitter: false,
        },
        ..Default::default()
    }
}

/// Required artifact whose digest and size match `bytes`
pub fn required(bytes: &[u8], location: &str, filename: Option<&str>) -> RequiredArtifact {
    let artifact = Artifact::new(
        digest_bytes(bytes),
        bytes.len() as u64,
        [SourceLocation::from(location)],
    );
    RequiredArtifact::new(artifact, filename.map(str::to_string))
}

/// Lockfile document listing `artifacts`, with a requirements section to be skipped
pub fn lockfile_json(artifacts: &[RequiredArtifact]) -> String {
    serde_json::json!({
        "requirements": [{"id": "org/app", "constraints": [], "exclusions": []}],
        "context": [],
        "artifacts": artifacts,
    })
    .to_string()
}

/// Every regular file under `<root>/cache`, sorted
pub fn cache_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root.join("cache"))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Deterministic payload of `len` bytes
pub fn payload(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
}
