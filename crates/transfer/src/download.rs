//! Streamed HTTP download to a file.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::TransferError;
use crate::progress::{PROGRESS_DOWNLOADED, PROGRESS_STARTED, ProgressReporter, download_percent};

/// Returns the file name component of a download URL.
pub fn archive_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Downloads `url` into `destination`, reporting progress.
///
/// Emits [`PROGRESS_STARTED`] once the response headers arrive, then
/// byte-proportional values up to 98, then [`PROGRESS_DOWNLOADED`].
/// `size_hint` is used for progress when the server sends no
/// `Content-Length`. A body shorter than the announced length is an
/// error; the partial file is left in place.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    destination: &Path,
    size_hint: Option<u64>,
    progress: &ProgressReporter,
) -> Result<u64, TransferError> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut resp = client.get(url).send().await?.error_for_status()?;
    progress.report(PROGRESS_STARTED);

    let content_length = resp.content_length();
    let total = content_length.or(size_hint).unwrap_or(0);

    tracing::debug!(url, destination = %destination.display(), total, "download started");

    let mut file = tokio::fs::File::create(destination).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.report(download_percent(written, total));
    }
    file.flush().await?;

    if let Some(expected) = content_length {
        if written != expected {
            return Err(TransferError::Incomplete {
                expected,
                received: written,
            });
        }
    }

    progress.report(PROGRESS_DOWNLOADED);
    tracing::debug!(destination = %destination.display(), bytes = written, "download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a mock HTTP server that announces `content_length` and sends
    /// `body` in `chunks` pieces before closing the connection.
    async fn mock_server(
        body: Vec<u8>,
        content_length: usize,
        chunks: usize,
    ) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/files/wine-9.0-amd64.tar.xz");

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let piece = body.len().div_ceil(chunks.max(1)).max(1);
                for part in body.chunks(piece) {
                    let _ = stream.write_all(part).await;
                    let _ = stream.flush().await;
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    async fn mock_status(status: u16) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/missing.tar.xz");

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {status} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<u8>) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(v) = rx.try_recv() {
            values.push(v);
        }
        values
    }

    #[test]
    fn archive_file_name_from_url() {
        assert_eq!(
            archive_file_name("https://github.com/Kron4ek/Wine-Builds/releases/download/9.0/wine-9.0-amd64.tar.xz"),
            "wine-9.0-amd64.tar.xz"
        );
        assert_eq!(archive_file_name("https://x/y/a.tar.xz?raw=1"), "a.tar.xz");
        assert_eq!(archive_file_name("plain.tar.xz"), "plain.tar.xz");
    }

    #[tokio::test]
    async fn download_reports_monotonic_progress() {
        let body = vec![7u8; 1000];
        let (url, handle) = mock_server(body.clone(), body.len(), 10).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("nested").join("archive.tar.xz");

        let (reporter, mut rx) = ProgressReporter::channel();
        let client = reqwest::Client::new();
        let written = download_to_file(&client, &url, &dest, None, &reporter)
            .await
            .unwrap();

        assert_eq!(written, 1000);
        assert_eq!(std::fs::read(&dest).unwrap(), body);

        let values = drain(&mut rx);
        assert_eq!(values.first(), Some(&PROGRESS_STARTED));
        assert_eq!(values.last(), Some(&PROGRESS_DOWNLOADED));
        assert!(values.windows(2).all(|w| w[0] < w[1]), "not increasing: {values:?}");
        let middle = &values[1..values.len() - 1];
        assert!(middle.iter().all(|v| (2..=98).contains(v)), "{values:?}");

        handle.abort();
    }

    #[tokio::test]
    async fn interrupted_download_fails_without_completion() {
        // Announce 1000 bytes but only send half of them.
        let (url, handle) = mock_server(vec![1u8; 500], 1000, 5).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("archive.tar.xz");

        let reporter = ProgressReporter::silent();
        let client = reqwest::Client::new();
        let result = download_to_file(&client, &url, &dest, None, &reporter).await;

        assert!(result.is_err());
        assert!(reporter.last() < PROGRESS_DOWNLOADED);
        assert!(reporter.last() >= PROGRESS_STARTED);

        handle.abort();
    }

    #[tokio::test]
    async fn http_error_status_fails_before_start() {
        let (url, handle) = mock_status(404).await;
        let tmp = tempfile::tempdir().unwrap();

        let reporter = ProgressReporter::silent();
        let client = reqwest::Client::new();
        let result =
            download_to_file(&client, &url, &tmp.path().join("a.tar.xz"), None, &reporter).await;

        assert!(matches!(result, Err(TransferError::Http(_))));
        assert_eq!(reporter.last(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_host_fails() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let tmp = tempfile::tempdir().unwrap();
        let reporter = ProgressReporter::silent();
        let client = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{port}/a.tar.xz");
        let result =
            download_to_file(&client, &url, &tmp.path().join("a.tar.xz"), None, &reporter).await;

        assert!(result.is_err());
        assert_eq!(reporter.last(), 0);
    }
}
