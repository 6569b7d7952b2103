//! GitHub releases API client.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::CtError;

/// Sent with every request; the GitHub API rejects anonymous agents.
const USER_AGENT: &str = concat!("compatkit/", env!("CARGO_PKG_VERSION"));

/// Predicate selecting the release asset to download by file name.
pub type AssetFilter = fn(&str) -> bool;

/// A release asset as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// A release as returned by the API.
///
/// Error payloads (`{"message": "Not Found"}`) deserialize with no tag.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Error payload (`{"message": "API rate limit exceeded ..."}`).
#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Download information for one release of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseMetadata {
    pub version: String,
    pub publish_date: Option<NaiveDate>,
    pub download_url: Option<String>,
    pub size_bytes: Option<u64>,
}

impl ReleaseMetadata {
    /// Builds metadata from a release, picking the first asset accepted by
    /// `filter`. Returns `None` if the release has no tag.
    pub fn from_release(release: &Release, filter: AssetFilter) -> Option<Self> {
        let version = release.tag_name.clone()?;
        let publish_date = release
            .published_at
            .as_deref()
            .and_then(|ts| ts.split('T').next())
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());

        let asset = release.assets.iter().find(|a| filter(&a.name));

        Some(Self {
            version,
            publish_date,
            download_url: asset.map(|a| a.browser_download_url.clone()),
            size_bytes: asset.map(|a| a.size),
        })
    }
}

/// Client for a GitHub `.../releases` endpoint.
#[derive(Debug, Clone)]
pub struct ReleaseCatalogClient {
    http: reqwest::Client,
    releases_url: String,
}

impl ReleaseCatalogClient {
    /// Creates a client for `releases_url`
    /// (e.g. `https://api.github.com/repos/<owner>/<repo>/releases`).
    pub fn new(releases_url: impl Into<String>) -> Result<Self, CtError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(http, releases_url))
    }

    /// Creates a client sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, releases_url: impl Into<String>) -> Self {
        Self {
            http,
            releases_url: releases_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, CtError> {
        let resp = self.http.get(url).query(params).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ApiError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
            return Err(CtError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches a release by tag, or the latest release for `"latest"`.
    ///
    /// Returns `Ok(None)` if the tag does not exist or the response carries
    /// no release tag. Other error statuses are returned as [`CtError::Status`].
    pub async fn fetch_release(&self, tag: &str) -> Result<Option<Release>, CtError> {
        let url = if tag.is_empty() || tag == "latest" {
            format!("{}/latest", self.releases_url)
        } else {
            format!("{}/tags/{tag}", self.releases_url)
        };

        let release: Release = match self.get_json(&url, &[]).await {
            Ok(release) => release,
            Err(CtError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(release.tag_name.is_some().then_some(release))
    }

    /// Fetches download metadata for `tag`.
    ///
    /// Transport and decoding failures are logged and yield `None`.
    pub async fn fetch_release_metadata(
        &self,
        tag: &str,
        filter: AssetFilter,
    ) -> Option<ReleaseMetadata> {
        match self.fetch_release(tag).await {
            Ok(Some(release)) => ReleaseMetadata::from_release(&release, filter),
            Ok(None) => {
                tracing::warn!(tag, url = %self.releases_url, "release not found");
                None
            }
            Err(CtError::Status { status, message }) => {
                tracing::warn!(
                    tag,
                    url = %self.releases_url,
                    status,
                    %message,
                    "release request rejected"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    tag,
                    url = %self.releases_url,
                    error = %e,
                    "failed to fetch release"
                );
                None
            }
        }
    }

    /// Lists up to `limit` release tags, newest first.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn list_available_release_tags(&self, limit: u32) -> Vec<String> {
        let params = [("per_page", limit.to_string())];
        match self.get_json::<Vec<Release>>(&self.releases_url, &params).await {
            Ok(releases) => releases
                .into_iter()
                .filter_map(|r| r.tag_name)
                .take(limit as usize)
                .collect(),
            Err(e) => {
                tracing::warn!(url = %self.releases_url, error = %e, "failed to list releases");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a mock HTTP server that answers one request with `body`
    /// and forwards the request line through the returned handle.
    async fn mock_server(
        status: u16,
        body: &str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/repos/o/r/releases");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return String::new();
            };
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();

            let resp = format!(
                "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;

            request.lines().next().unwrap_or_default().to_string()
        });

        (url, handle)
    }

    fn amd64_tar_xz(name: &str) -> bool {
        name.ends_with("tar.xz") && name.contains("amd64") && !name.contains("staging")
    }

    const RELEASE: &str = r#"{
        "tag_name": "9.0",
        "published_at": "2024-01-16T20:11:05Z",
        "assets": [
            {"name": "wine-9.0-x86.tar.xz", "browser_download_url": "https://dl/wine-9.0-x86.tar.xz", "size": 10},
            {"name": "wine-9.0-staging-amd64.tar.xz", "browser_download_url": "https://dl/wine-9.0-staging-amd64.tar.xz", "size": 20},
            {"name": "wine-9.0-amd64.tar.xz", "browser_download_url": "https://dl/wine-9.0-amd64.tar.xz", "size": 30},
            {"name": "wine-9.0-amd64-wow64.tar.xz", "browser_download_url": "https://dl/wine-9.0-amd64-wow64.tar.xz", "size": 40}
        ]
    }"#;

    #[tokio::test]
    async fn fetch_metadata_by_tag() {
        let (url, handle) = mock_server(200, RELEASE).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        let meta = client
            .fetch_release_metadata("9.0", amd64_tar_xz)
            .await
            .unwrap();
        assert_eq!(meta.version, "9.0");
        assert_eq!(meta.publish_date, NaiveDate::from_ymd_opt(2024, 1, 16));
        // First matching asset wins.
        assert_eq!(
            meta.download_url.as_deref(),
            Some("https://dl/wine-9.0-amd64.tar.xz")
        );
        assert_eq!(meta.size_bytes, Some(30));

        let request_line = handle.await.unwrap();
        assert!(request_line.starts_with("GET /repos/o/r/releases/tags/9.0 "));
    }

    #[tokio::test]
    async fn fetch_latest_uses_latest_endpoint() {
        let (url, handle) = mock_server(200, RELEASE).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        assert!(client.fetch_release("latest").await.unwrap().is_some());
        let request_line = handle.await.unwrap();
        assert!(request_line.starts_with("GET /repos/o/r/releases/latest "));
    }

    #[tokio::test]
    async fn missing_tag_is_none() {
        let (url, handle) = mock_server(404, r#"{"message":"Not Found"}"#).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        assert!(client.fetch_release_metadata("0.0", amd64_tar_xz).await.is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn not_found_status_is_none() {
        let (url, handle) = mock_server(404, r#"{"message":"Not Found"}"#).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        assert!(client.fetch_release("0.0").await.unwrap().is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn rate_limit_is_reported_as_status() {
        let body = r#"{"message":"API rate limit exceeded for 127.0.0.1."}"#;
        let (url, handle) = mock_server(403, body).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        match client.fetch_release("9.0").await {
            Err(CtError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.starts_with("API rate limit exceeded"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn error_status_without_json_keeps_body() {
        let (url, handle) = mock_server(502, "bad gateway").await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        let err = client.fetch_release("latest").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
        handle.abort();
    }

    #[tokio::test]
    async fn malformed_body_is_none() {
        let (url, handle) = mock_server(200, "<html>rate limited</html>").await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        assert!(client.fetch_release_metadata("9.0", amd64_tar_xz).await.is_none());
        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_host_is_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ReleaseCatalogClient::new(format!("http://127.0.0.1:{port}/r")).unwrap();
        assert!(client.fetch_release_metadata("9.0", amd64_tar_xz).await.is_none());
        assert!(client.list_available_release_tags(5).await.is_empty());
    }

    #[tokio::test]
    async fn list_tags_newest_first() {
        let body = r#"[
            {"tag_name": "9.1", "assets": []},
            {"tag_name": "9.0", "assets": []},
            {"message": "odd entry"},
            {"tag_name": "8.21", "assets": []}
        ]"#;
        let (url, handle) = mock_server(200, body).await;
        let client = ReleaseCatalogClient::new(url).unwrap();

        let tags = client.list_available_release_tags(3).await;
        assert_eq!(tags, vec!["9.1", "9.0", "8.21"]);

        let request_line = handle.await.unwrap();
        assert!(request_line.contains("per_page=3"));
    }

    #[test]
    fn metadata_without_matching_asset() {
        let release = Release {
            tag_name: Some("9.0".into()),
            published_at: None,
            assets: vec![ReleaseAsset {
                name: "wine-9.0-x86.tar.xz".into(),
                browser_download_url: "https://dl/x86".into(),
                size: 1,
            }],
        };
        let meta = ReleaseMetadata::from_release(&release, amd64_tar_xz).unwrap();
        assert_eq!(meta.download_url, None);
        assert_eq!(meta.size_bytes, None);
        assert_eq!(meta.publish_date, None);
    }

    #[test]
    fn metadata_requires_tag() {
        assert!(ReleaseMetadata::from_release(&Release::default(), amd64_tar_xz).is_none());
    }
}
