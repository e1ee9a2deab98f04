//! HTTP fetch stage: one GET per URL over a shared client.
//!
//! [`ImageFetcher`] is the seam between the downloader and the network.
//! [`HttpFetcher`] is the production implementation: a single
//! `reqwest::Client` built once per downloader so connections are reused
//! across the whole batch. Tests plug in their own fetcher through
//! [`crate::config::DownloadConfigBuilder::fetcher`].

use crate::config::DownloadConfig;
use crate::error::{ItemError, Sheet2ImgError};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

/// A successfully received response body with its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fetches the raw bytes behind an image URL.
///
/// Implementations report every failure as an [`ItemError`]; they never
/// abort the batch.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ItemError>;
}

/// Reject responses whose declared type is absent or not `image/*`.
pub fn ensure_image_content_type(content_type: Option<&str>) -> Result<(), ItemError> {
    let declared = content_type.unwrap_or("").trim();
    if declared.to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(ItemError::NotAnImage {
            content_type: declared.to_string(),
        })
    }
}

/// `reqwest`-backed fetcher with a per-request timeout and a body cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self, Sheet2ImgError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Sheet2ImgError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            max_bytes: config.max_image_bytes,
        })
    }

    fn map_reqwest(&self, e: reqwest::Error) -> ItemError {
        if e.is_timeout() {
            ItemError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ItemError::Request {
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ItemError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // Checked before the body is pulled so HTML error pages are not downloaded.
        ensure_image_content_type(content_type.as_deref())?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(ItemError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut bytes = Vec::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.map_reqwest(e))?;
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(ItemError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(FetchedImage {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request on an ephemeral port with `response`, then
    /// close the connection. Returns a URL pointing at it.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let _ = sock.write_all(&response).await;
                let _ = sock.shutdown().await;
            }
        });
        format!("http://{addr}/img/1.jpg")
    }

    fn response(head: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!("{head}\r\nConnection: close\r\n\r\n").into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn fetcher(max_bytes: u64) -> HttpFetcher {
        let config = DownloadConfig::builder()
            .timeout_secs(5)
            .max_image_bytes(max_bytes)
            .build()
            .unwrap();
        HttpFetcher::new(&config).unwrap()
    }

    #[test]
    fn image_content_types_pass() {
        assert!(ensure_image_content_type(Some("image/jpeg")).is_ok());
        assert!(ensure_image_content_type(Some("Image/PNG; charset=binary")).is_ok());
    }

    #[test]
    fn other_content_types_fail() {
        assert_eq!(
            ensure_image_content_type(Some("text/html; charset=utf-8")),
            Err(ItemError::NotAnImage {
                content_type: "text/html; charset=utf-8".into()
            })
        );
        assert!(matches!(
            ensure_image_content_type(None),
            Err(ItemError::NotAnImage { .. })
        ));
    }

    #[test]
    fn http_fetcher_builds_from_default_config() {
        let fetcher = HttpFetcher::new(&DownloadConfig::default()).expect("client builds");
        assert_eq!(fetcher.timeout_secs, 30);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let config = DownloadConfig::builder().timeout_secs(2).build().unwrap();
        let fetcher = HttpFetcher::new(&config).unwrap();
        // Port 9 (discard) on localhost is closed on test machines.
        let err = fetcher.fetch("http://127.0.0.1:9/a.jpg").await.unwrap_err();
        assert!(err.is_fetch_failure(), "got: {err}");
    }

    #[tokio::test]
    async fn image_response_is_returned() {
        let url = serve_once(response(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4",
            b"\x89PNG",
        ))
        .await;
        let img = fetcher(1024).fetch(&url).await.unwrap();
        assert_eq!(img.content_type.as_deref(), Some("image/png"));
        assert_eq!(img.bytes, b"\x89PNG");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let url = serve_once(response(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0",
            b"",
        ))
        .await;
        let err = fetcher(1024).fetch(&url).await.unwrap_err();
        assert_eq!(err, ItemError::HttpStatus { status: 404 });
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[tokio::test]
    async fn html_page_is_not_an_image() {
        let url = serve_once(response(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: 7",
            b"<html/>",
        ))
        .await;
        let err = fetcher(1024).fetch(&url).await.unwrap_err();
        assert_eq!(
            err,
            ItemError::NotAnImage {
                content_type: "text/html; charset=utf-8".into()
            }
        );
    }

    #[tokio::test]
    async fn declared_length_over_cap_is_too_large() {
        let body = vec![0u8; 100];
        let url = serve_once(response(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 100",
            &body,
        ))
        .await;
        let err = fetcher(16).fetch(&url).await.unwrap_err();
        assert_eq!(err, ItemError::TooLarge { limit: 16 });
    }

    #[tokio::test]
    async fn streamed_body_over_cap_is_too_large() {
        // No Content-Length: the body runs until the connection closes.
        let body = vec![0u8; 100];
        let url = serve_once(response("HTTP/1.1 200 OK\r\nContent-Type: image/jpeg", &body)).await;
        let err = fetcher(16).fetch(&url).await.unwrap_err();
        assert_eq!(err, ItemError::TooLarge { limit: 16 });
    }
}
