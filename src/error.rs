//! Error types for adept-artifacts
//!
//! This module provides the error handling for the library:
//! - Domain-specific error types (cache integrity, fetch preconditions)
//! - Machine-readable error codes for structured logging
//! - Context information (digest, file path, source location, etc.)

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ContentDigest;

/// Result type alias for adept-artifacts operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for adept-artifacts
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "temp_dir")
        key: Option<String>,
    },

    /// Content store error (integrity or layout)
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Fetch-related error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Lockfile could not be parsed
    #[error("lockfile error: {0}")]
    Lockfile(#[from] serde_json::Error),

    /// Internal invariant violated (a fetch task panicked or produced no outcome)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Content store errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Digest string is not a 64 character hex value
    #[error("invalid digest {value:?}: {reason}")]
    InvalidDigest {
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Bytes offered for adoption do not hash to the promised digest
    #[error("expected {path} (cached as {filename}) to have digest {expected} but it was {actual}")]
    DigestMismatch {
        /// The staging file that was hashed
        path: PathBuf,
        /// Filename the bytes would have been cached under
        filename: String,
        /// The digest declared for the artifact
        expected: ContentDigest,
        /// The digest actually computed
        actual: ContentDigest,
    },

    /// An entry already stored at a content-addressed path does not match its key
    #[error("cache entry {path} is corrupt: expected digest {expected} but it was {actual}")]
    CorruptEntry {
        /// Path of the corrupt entry
        path: PathBuf,
        /// The digest the path is keyed by
        expected: ContentDigest,
        /// The digest actually computed
        actual: ContentDigest,
    },

    /// Filename cannot be used as a single path component
    #[error("invalid cache filename {0:?}")]
    InvalidFilename(String),

    /// Shard directory could not be created
    #[error("could not create cache directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },
}

/// Fetch-related errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Artifact does not declare exactly one source location
    #[error("exactly one source location is supported, artifact {digest} declares {count}")]
    UnsupportedLocationCount {
        /// Digest of the offending artifact
        digest: ContentDigest,
        /// Number of locations declared
        count: usize,
    },

    /// Source location is not a usable URI
    #[error("invalid source location {location:?}: {reason}")]
    InvalidLocation {
        /// The location string
        location: String,
        /// Why it could not be used
        reason: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {location}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// The location that was requested
        location: String,
    },

    /// Batch deadline elapsed before the fetch finished
    #[error("cancelled: batch deadline elapsed")]
    Cancelled,
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Cache(CacheError::InvalidDigest { .. }) => "invalid_digest",
            Error::Cache(CacheError::DigestMismatch { .. }) => "digest_mismatch",
            Error::Cache(CacheError::CorruptEntry { .. }) => "corrupt_cache_entry",
            Error::Cache(CacheError::InvalidFilename(_)) => "invalid_filename",
            Error::Cache(CacheError::CreateDir { .. }) => "cache_dir_error",
            Error::Fetch(FetchError::UnsupportedLocationCount { .. }) => "unsupported_locations",
            Error::Fetch(FetchError::InvalidLocation { .. }) => "invalid_location",
            Error::Fetch(FetchError::HttpStatus { .. }) => "http_status",
            Error::Fetch(FetchError::Cancelled) => "cancelled",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Lockfile(_) => "lockfile_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// True for content integrity violations, which are never retried
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Error::Cache(CacheError::DigestMismatch { .. } | CacheError::CorruptEntry { .. })
        )
    }

    /// Underlying cause of this error, if it wraps another error
    pub fn cause(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self).and_then(std::error::Error::source)
    }
}
