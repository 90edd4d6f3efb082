//! Outbound image fetch
//!
//! One GET per request against the remote host. No retries, no caching; the
//! timeout is whatever `reqwest` defaults to.

use hyper::body::Bytes;
use hyper::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use thiserror::Error;

/// `Accept` header sent upstream, as a browser navigating to the image would
pub const UPSTREAM_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// `User-Agent` sent upstream when the caller did not provide one
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Why an image could not be fetched
///
/// The `Display` text is what the caller receives as the response body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Remote host answered with a non-2xx status
    #[error("获取图片失败: {}{}", .status.as_u16(), reason_suffix(.reason))]
    Status { status: StatusCode, reason: String },
    /// Request never produced a usable response
    #[error("网络请求失败: {0}")]
    Network(String),
}

impl FetchError {
    /// Error for a non-2xx answer. `reason` is the phrase from the status
    /// line; without one the canonical phrase for `status` is used, if any.
    pub fn upstream(status: StatusCode, reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| status.canonical_reason())
            .unwrap_or_default();
        Self::Status {
            status,
            reason: reason.to_string(),
        }
    }

    /// Status code returned to the caller
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            Self::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" {reason}")
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Source of image bytes
///
/// The server uses [`UpstreamFetcher`]; tests substitute canned results.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<Bytes, FetchError>;
}

/// Fetches images over HTTP(S) with a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
}

impl UpstreamFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Fetcher that ignores any proxy configured in the environment, so
    /// tests can reach local servers
    #[cfg(test)]
    pub fn without_proxy() -> Self {
        Self {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }
}

impl ImageFetcher for UpstreamFetcher {
    async fn fetch(&self, url: &str, user_agent: Option<&str>) -> Result<Bytes, FetchError> {
        let user_agent = user_agent
            .filter(|ua| !ua.is_empty())
            .unwrap_or(FALLBACK_USER_AGENT);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, UPSTREAM_ACCEPT)
            .header(USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
            return Err(FetchError::upstream(status, reason.as_deref()));
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local stand-in for the remote host. Answers every request with
    /// `status` and a body echoing the `Accept` and `User-Agent` it received.
    async fn spawn_upstream(status: u16) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| async move {
                        let header = |name: &str| {
                            req.headers()
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("-")
                                .to_string()
                        };
                        let body = format!("{}\n{}", header("accept"), header("user-agent"));
                        let resp = Response::builder()
                            .status(status)
                            .body(Full::new(Bytes::from(body)))
                            .unwrap();
                        Ok::<_, Infallible>(resp)
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        addr
    }

    /// Remote host that answers once with a hand-written status line, for
    /// reason phrases hyper's server would never produce
    async fn spawn_raw_upstream(status_line: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response =
                format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
        addr
    }

    #[test]
    fn test_status_message_without_reason() {
        let err = FetchError::upstream(StatusCode::from_u16(599).unwrap(), None);
        assert_eq!(err.to_string(), "获取图片失败: 599");

        let err = FetchError::upstream(StatusCode::BAD_GATEWAY, Some(""));
        assert_eq!(err.to_string(), "获取图片失败: 502 Bad Gateway");

        let err = FetchError::upstream(StatusCode::NOT_FOUND, Some("Gone Fishing"));
        assert_eq!(err.to_string(), "获取图片失败: 404 Gone Fishing");
    }

    #[tokio::test]
    async fn test_fetch_keeps_upstream_reason_phrase() {
        let addr = spawn_raw_upstream("HTTP/1.1 404 Gone Fishing").await;
        let err = UpstreamFetcher::without_proxy()
            .fetch(&format!("http://{addr}/h/1.webp"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "获取图片失败: 404 Gone Fishing");
    }

    #[tokio::test]
    async fn test_fetch_unknown_status_has_no_trailing_space() {
        let addr = spawn_raw_upstream("HTTP/1.1 599 ").await;
        let err = UpstreamFetcher::without_proxy()
            .fetch(&format!("http://{addr}/h/1.webp"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 599);
        assert_eq!(err.to_string(), "获取图片失败: 599");
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let addr = spawn_upstream(200).await;
        let fetcher = UpstreamFetcher::without_proxy();
        let bytes = fetcher
            .fetch(&format!("http://{addr}/h/1.webp"), Some("tester/1.0"))
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes.to_vec()).unwrap(),
            format!("{UPSTREAM_ACCEPT}\ntester/1.0")
        );
    }

    #[tokio::test]
    async fn test_fetch_uses_fallback_agent() {
        let addr = spawn_upstream(200).await;
        let fetcher = UpstreamFetcher::without_proxy();
        for agent in [None, Some("")] {
            let bytes = fetcher
                .fetch(&format!("http://{addr}/v/3.webp"), agent)
                .await
                .unwrap();
            let body = String::from_utf8(bytes.to_vec()).unwrap();
            assert!(body.ends_with(FALLBACK_USER_AGENT), "{body}");
        }
    }

    #[tokio::test]
    async fn test_fetch_passes_upstream_status() {
        let addr = spawn_upstream(404).await;
        let fetcher = UpstreamFetcher::without_proxy();
        let err = fetcher
            .fetch(&format!("http://{addr}/v/99999.webp"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "获取图片失败: 404 Not Found");
    }

    #[tokio::test]
    async fn test_fetch_network_failure_is_500() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let fetcher = UpstreamFetcher::without_proxy();
        let err = fetcher
            .fetch(&format!("http://{addr}/h/1.webp"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("网络请求失败: "));
    }
}
