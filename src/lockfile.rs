//! Lockfile: the set of artifacts a project requires
//!
//! Only the `artifacts` section is interpreted here. Other sections
//! (`requirements`, `context`, ...) belong to dependency resolution and are
//! skipped when reading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::downloader::ArtifactFetcher;
use crate::error::Result;
use crate::types::{DownloadReport, RequiredArtifact};

/// Artifacts pinned by a lockfile
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    artifacts: BTreeSet<RequiredArtifact>,
}

impl Lockfile {
    /// Lockfile over the given artifacts
    pub fn new(artifacts: impl IntoIterator<Item = RequiredArtifact>) -> Self {
        Self {
            artifacts: artifacts.into_iter().collect(),
        }
    }

    /// Parse a lockfile document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the lockfile at `path`; a missing file is an empty lockfile
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No lockfile, nothing required");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Required artifacts
    pub fn artifacts(&self) -> &BTreeSet<RequiredArtifact> {
        &self.artifacts
    }

    /// Make every required artifact available through `fetcher`
    ///
    /// See [`ArtifactFetcher::download`].
    pub async fn download(&self, fetcher: &ArtifactFetcher) -> Result<DownloadReport> {
        fetcher.download(&self.artifacts).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> String {
        format!(
            r#"{{
                "requirements": [{{"id": "org/lib", "constraints": []}}],
                "context": [],
                "artifacts": [
                    {{
                        "hash": "{hash}",
                        "size": 4096,
                        "locations": ["http://repo/lib-1.0.jar"],
                        "attributes": [{{"name": "configuration", "values": ["compile"]}}],
                        "filename": "lib-1.0.jar"
                    }},
                    {{
                        "hash": "{other}",
                        "size": 10,
                        "locations": ["http://repo/anon"]
                    }}
                ]
            }}"#,
            hash = "AB".repeat(32),
            other = "cd".repeat(32),
        )
    }

    #[test]
    fn parses_artifacts_and_ignores_other_sections() {
        let lockfile = Lockfile::from_json(&sample()).unwrap();
        assert_eq!(lockfile.artifacts().len(), 2);

        let named = lockfile
            .artifacts()
            .iter()
            .find(|a| a.filename.is_some())
            .unwrap();
        assert_eq!(named.artifact.digest.as_str(), "ab".repeat(32));
        assert_eq!(named.artifact.size, 4096);
        assert_eq!(named.artifact.locations_joined(), "http://repo/lib-1.0.jar");
        assert_eq!(named.cache_filename(), "lib-1.0.jar");
        let attribute = named.attributes.iter().next().unwrap();
        assert_eq!(attribute.name, "configuration");
        assert!(attribute.values.contains("compile"));

        let anon = lockfile
            .artifacts()
            .iter()
            .find(|a| a.filename.is_none())
            .unwrap();
        assert!(anon.attributes.is_empty());
        assert_eq!(anon.cache_filename(), "cd".repeat(32));
    }

    #[test]
    fn document_without_artifacts_is_empty() {
        let lockfile = Lockfile::from_json(r#"{"requirements": []}"#).unwrap();
        assert!(lockfile.artifacts().is_empty());
    }

    #[test]
    fn invalid_digest_is_a_parse_error() {
        let json = r#"{"artifacts": [{"hash": "xyz", "size": 1, "locations": []}]}"#;
        assert!(matches!(Lockfile::from_json(json), Err(Error::Lockfile(_))));
    }

    #[test]
    fn missing_file_is_an_empty_lockfile() {
        let dir = tempfile::tempdir().unwrap();
        let lockfile = Lockfile::read(&dir.path().join("adept.lock")).unwrap();
        assert_eq!(lockfile, Lockfile::default());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adept.lock");
        std::fs::write(&path, sample()).unwrap();
        assert_eq!(Lockfile::read(&path).unwrap().artifacts().len(), 2);
    }

    #[test]
    fn survives_serialization() {
        let lockfile = Lockfile::from_json(&sample()).unwrap();
        let json = serde_json::to_string(&lockfile).unwrap();
        assert_eq!(Lockfile::from_json(&json).unwrap(), lockfile);
    }
}
