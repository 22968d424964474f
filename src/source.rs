//! Where artifact bytes come from
//!
//! [`ArtifactSource`] abstracts the network transfer so fetch tasks can be
//! tested without a server. [`HttpSource`] is the production implementation.

use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{Error, FetchError, Result};
use crate::types::SourceLocation;

/// Streams the bytes at a location into a local file
#[async_trait::async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Write the content at `location` to `dest`, truncating it first.
    /// Returns the number of bytes written.
    async fn fetch(&self, location: &SourceLocation, dest: &Path) -> Result<u64>;
}

/// Fetches `http`, `https` and `file` locations
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client sending the configured `User-Agent` and request timeout
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::Config {
            message: format!("Failed to create HTTP client: {}", e),
            key: Some("user_agent".to_string()),
        })?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: url::Url, location: &SourceLocation, dest: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                location: location.to_string(),
            }
            .into());
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl ArtifactSource for HttpSource {
    async fn fetch(&self, location: &SourceLocation, dest: &Path) -> Result<u64> {
        let url = location.url()?;
        match url.scheme() {
            "http" | "https" => self.fetch_http(url, location, dest).await,
            "file" => {
                let path = url.to_file_path().map_err(|()| FetchError::InvalidLocation {
                    location: location.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                Ok(tokio::fs::copy(&path, dest).await?)
            }
            other => Err(FetchError::InvalidLocation {
                location: location.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }
            .into()),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn streams_body_to_file_with_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.jar"))
            .and(header("User-Agent", "AdeptDownloader/1.0-ALPHA"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("staging");
        let source = HttpSource::new(&Config::default()).unwrap();
        let location = SourceLocation::new(format!("{}/lib.jar", server.uri()));

        let written = source.fetch(&location, &dest).await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let source = HttpSource::new(&Config::default()).unwrap();
        let location = SourceLocation::new(format!("{}/x", server.uri()));

        match source.fetch(&location, &dir.path().join("s")).await {
            Err(Error::Fetch(FetchError::HttpStatus { status, .. })) => assert_eq!(status, 503),
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refetch_truncates_previous_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"short".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("staging");
        std::fs::write(&dest, b"a much longer leftover from a failed attempt").unwrap();

        let source = HttpSource::new(&Config::default()).unwrap();
        let location = SourceLocation::new(format!("{}/x", server.uri()));
        source.fetch(&location, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"short");
    }

    #[tokio::test]
    async fn file_locations_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin.jar");
        std::fs::write(&origin, b"local").unwrap();
        let location = SourceLocation::new(url::Url::from_file_path(&origin).unwrap().to_string());

        let dest = dir.path().join("staging");
        let source = HttpSource::new(&Config::default()).unwrap();
        assert_eq!(source.fetch(&location, &dest).await.unwrap(), 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"local");
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpSource::new(&Config::default()).unwrap();
        let location = SourceLocation::new("ftp://example.com/x.jar");
        assert!(matches!(
            source.fetch(&location, &dir.path().join("s")).await,
            Err(Error::Fetch(FetchError::InvalidLocation { .. }))
        ));
    }
}
