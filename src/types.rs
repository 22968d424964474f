//! Core types for adept-artifacts

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Error, FetchError};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 digest identifying artifact content
///
/// Construction validates the value, so every `ContentDigest` in circulation
/// is safe to use as a cache key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Validate and wrap a hex digest. Uppercase input is lowercased.
    pub fn new(value: impl Into<String>) -> std::result::Result<Self, CacheError> {
        let value = value.into();
        if value.len() != DIGEST_HEX_LEN {
            return Err(CacheError::InvalidDigest {
                reason: format!("expected {} hex characters, got {}", DIGEST_HEX_LEN, value.len()),
                value,
            });
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CacheError::InvalidDigest {
                value,
                reason: "contains non-hex characters".to_string(),
            });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Sha256 `{:x}` output is always 64 lowercase hex characters
    pub(crate) fn from_sha256_hex(hex: String) -> Self {
        debug_assert_eq!(hex.len(), DIGEST_HEX_LEN);
        Self(hex)
    }

    /// The hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

/// URI an artifact's bytes can be fetched from
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocation(String);

impl SourceLocation {
    /// Wrap a location string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw location string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the location as a URL
    pub fn url(&self) -> crate::Result<url::Url> {
        url::Url::parse(&self.0).map_err(|e| {
            Error::Fetch(FetchError::InvalidLocation {
                location: self.0.clone(),
                reason: e.to_string(),
            })
        })
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceLocation {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Content digest, declared size and candidate locations of one artifact
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// Expected digest of the content
    #[serde(rename = "hash")]
    pub digest: ContentDigest,
    /// Declared size in bytes; used for progress only, never verified
    pub size: u64,
    /// Where the bytes can be fetched from
    pub locations: BTreeSet<SourceLocation>,
}

impl Artifact {
    /// Create an artifact
    pub fn new(
        digest: ContentDigest,
        size: u64,
        locations: impl IntoIterator<Item = SourceLocation>,
    ) -> Self {
        Self {
            digest,
            size,
            locations: locations.into_iter().collect(),
        }
    }

    /// Comma-separated list of locations, for log lines
    pub fn locations_joined(&self) -> String {
        self.locations
            .iter()
            .map(SourceLocation::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Declared size in KiB, the progress unit
    pub fn size_kib(&self) -> u64 {
        self.size / 1024
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})::{}", self.digest, self.size, self.locations_joined())
    }
}

/// Named set of string values attached to an artifact
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactAttribute {
    /// Attribute name
    pub name: String,
    /// Attribute values
    #[serde(default)]
    pub values: BTreeSet<String>,
}

/// An artifact as required by a lockfile: content plus where to put it
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequiredArtifact {
    /// The artifact itself
    #[serde(flatten)]
    pub artifact: Artifact,
    /// Desired on-disk filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Metadata; not interpreted by the cache
    #[serde(default)]
    pub attributes: BTreeSet<ArtifactAttribute>,
}

impl RequiredArtifact {
    /// Create a required artifact without attributes
    pub fn new(artifact: Artifact, filename: Option<String>) -> Self {
        Self {
            artifact,
            filename,
            attributes: BTreeSet::new(),
        }
    }

    /// Filename to cache under, falling back to the digest when none was declared
    pub fn cache_filename(&self) -> &str {
        self.filename
            .as_deref()
            .unwrap_or_else(|| self.artifact.digest.as_str())
    }
}

/// Terminal result of resolving one artifact
#[derive(Debug)]
pub enum FetchOutcome {
    /// The artifact is available locally
    Success {
        /// The artifact that was resolved
        artifact: Artifact,
        /// Filename it was cached under
        filename: String,
        /// Path of the cache entry
        path: PathBuf,
        /// Whether bytes were transferred over the network
        fetched: bool,
    },
    /// The artifact could not be resolved
    Failure {
        /// The artifact that failed
        artifact: Artifact,
        /// Filename it would have been cached under
        filename: String,
        /// Last error observed
        error: Error,
    },
}

impl FetchOutcome {
    /// The artifact this outcome is for
    pub fn artifact(&self) -> &Artifact {
        match self {
            FetchOutcome::Success { artifact, .. } | FetchOutcome::Failure { artifact, .. } => {
                artifact
            }
        }
    }

    /// The filename this outcome is for
    pub fn filename(&self) -> &str {
        match self {
            FetchOutcome::Success { filename, .. } | FetchOutcome::Failure { filename, .. } => {
                filename
            }
        }
    }

    /// True for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Cached path on success
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Success { path, .. } => Some(path),
            FetchOutcome::Failure { .. } => None,
        }
    }

    /// Error on failure
    pub fn error(&self) -> Option<&Error> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Failure { error, .. } => Some(error),
        }
    }
}

/// Every outcome of one batch download, in completion order
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// One outcome per requested artifact
    pub outcomes: Vec<FetchOutcome>,
}

impl DownloadReport {
    /// Successful outcomes
    pub fn successes(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when no artifact failed
    pub fn is_complete_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when the batch requested nothing
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
