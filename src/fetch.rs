//! Page retrieval behind a small trait seam.
//!
//! - [`PageFetcher`]: anything that can turn a URL into an HTML body
//! - [`HttpFetcher`]: the production implementation over `reqwest`
//!
//! Scrapers only depend on the trait so tests can feed canned markup.

use crate::errors::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Retrieve the body of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body as text.
    ///
    /// A response status outside 2xx/3xx is an error.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest::Client`.
///
/// Every request is bounded by the client-wide timeout; a timeout surfaces
/// as [`FetchError::Request`] like any other transport failure.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !(status.is_success() || status.is_redirection()) {
            warn!(%url, status = status.as_u16(), "Non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies; unknown URLs fail with a 404 status.
    #[derive(Debug, Default)]
    pub struct StubFetcher {
        pages: HashMap<String, Result<String, u16>>,
        requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn failing(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), Err(status));
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubFetcher;
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5), "news_snapshot/test");
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_stub_serves_and_fails() {
        let fetcher = StubFetcher::new()
            .page("http://x/ok", "<html></html>")
            .failing("http://x/down", 500);

        assert_eq!(fetcher.fetch("http://x/ok").await.unwrap(), "<html></html>");
        match fetcher.fetch("http://x/down").await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(fetcher.fetch("http://x/missing").await.is_err());
        assert_eq!(fetcher.requested().len(), 3);
    }
}

#[cfg(test)]
pub(crate) mod loopback {
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    /// Accept one connection on 127.0.0.1 and answer it with `response`,
    /// or hold it open without replying when `response` is `None`.
    ///
    /// Returns the base URL of the listener.
    pub async fn serve_once(response: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            match response {
                Some(raw) => {
                    let _ = socket.write_all(raw.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                None => sleep(Duration::from_secs(5)).await,
            }
        });
        format!("http://{addr}/")
    }

    pub const NOT_FOUND: &str =
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    pub const ARTICLE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
        Content-Length: 27\r\nConnection: close\r\n\r\n<title>Live article</title>";
}

#[cfg(test)]
mod http_tests {
    use super::loopback::{ARTICLE, NOT_FOUND, serve_once};
    use super::*;

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let url = serve_once(Some(ARTICLE)).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5), "news_snapshot/test").unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<title>Live article</title>");
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_error_status() {
        let url = serve_once(Some(NOT_FOUND)).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5), "news_snapshot/test").unwrap();

        match fetcher.fetch(&url).await {
            Err(FetchError::Status { url: failed, status }) => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out_on_stalled_server() {
        let url = serve_once(None).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(1), "news_snapshot/test").unwrap();

        let started = Instant::now();
        match fetcher.fetch(&url).await {
            Err(FetchError::Request(e)) => assert!(e.is_timeout(), "not a timeout: {e}"),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
