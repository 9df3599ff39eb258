//! Article content fetching: URL → raw readable text.
//!
//! The pipeline talks to the web through [`ContentGateway`]. [`HttpFetcher`]
//! performs a single GET per URL (no retries), refuses private/loopback
//! targets unless explicitly allowed, and extracts prose from HTML pages.
//! Every fault surfaces as [`FallacyDetectorError::Fetch`].

mod extract;

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument};
use url::Url;

use fallacydetector_shared::{Configuration, FallacyDetectorError, Result};

pub use extract::extract_article_text;

/// Maximum number of redirects to follow for one article.
const MAX_REDIRECTS: usize = 5;

/// Maximum response body we read (10 MB), declared or streamed.
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Opaque URL → raw text service.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Fetch `url` once and return its readable text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP-backed [`ContentGateway`].
pub struct HttpFetcher {
    client: Client,
    allow_private_hosts: bool,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher that identifies itself as `user_agent`.
    pub fn new(user_agent: &str, timeout: Duration, allow_private_hosts: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                FallacyDetectorError::fetch("-", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            allow_private_hosts,
            max_body_bytes: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the body size cap.
    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Create a fetcher from validated run configuration.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Self::new(
            config.user_agent(),
            config.fetch_timeout(),
            config.allow_private_hosts(),
        )
    }
}

#[async_trait]
impl ContentGateway for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| FallacyDetectorError::fetch(url, format!("invalid URL: {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&parsed) {
            return Err(FallacyDetectorError::fetch(
                url,
                "refusing to fetch private or non-HTTP target",
            ));
        }

        debug!("fetching article");

        let mut response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| FallacyDetectorError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FallacyDetectorError::fetch(url, format!("HTTP {status}")));
        }

        let max = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max {
                return Err(FallacyDetectorError::fetch(
                    url,
                    format!("response too large ({len} bytes, max {max})"),
                ));
            }
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));

        // Chunked responses declare no length, so the cap is also enforced while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FallacyDetectorError::fetch(url, format!("failed to read body: {e}")))?
        {
            if (bytes.len() + chunk.len()) as u64 > max {
                return Err(FallacyDetectorError::fetch(
                    url,
                    format!("response too large (over {max} bytes)"),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        let text = if is_html {
            extract_article_text(&body)
                .map_err(|e| FallacyDetectorError::fetch(url, e.to_string()))?
        } else {
            body
        };

        info!(chars = text.chars().count(), "article fetched");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_AGENT: &str = "FallacyDetectorTest/0.0";

    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::new(TEST_AGENT, Duration::from_secs(5), true).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_extracts_html() {
        let server = MockServer::start().await;

        let page = std::fs::read_to_string("../../../fixtures/html/article.html")
            .expect("read article fixture");

        Mock::given(method("GET"))
            .and(path("/news/climate"))
            .and(header("user-agent", TEST_AGENT))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(page, "text/html; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = local_fetcher()
            .fetch(&format!("{}/news/climate", server.uri()))
            .await
            .unwrap();

        assert!(text.contains("New Emissions Targets"));
        assert!(text.contains("Critics argue"));
        assert!(!text.contains("Sign up for our newsletter"));
        assert!(!text.contains("trackPageView"));
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("Plain <b>words</b> stay.", "text/plain"),
            )
            .mount(&server)
            .await;

        let text = local_fetcher().fetch(&server.uri()).await.unwrap();
        assert_eq!(text, "Plain <b>words</b> stay.");
    }

    #[tokio::test]
    async fn http_error_is_fetch_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = local_fetcher().fetch(&url).await.unwrap_err();
        match err {
            FallacyDetectorError::Fetch { url: failed, message } => {
                assert_eq!(failed, url);
                assert!(message.contains("404"));
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declared_oversize_body_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(4096), "text/plain"))
            .mount(&server)
            .await;

        let err = local_fetcher()
            .with_max_body_bytes(1024)
            .fetch(&server.uri())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("response too large"));
    }

    #[tokio::test]
    async fn chunked_oversize_body_is_rejected() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Hand-written server so the body goes out chunked with no Content-Length.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let mut reply = String::from(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\
                 Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            );
            for _ in 0..4 {
                reply.push_str(&format!("200\r\n{}\r\n", "y".repeat(512)));
            }
            reply.push_str("0\r\n\r\n");
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        let err = local_fetcher()
            .with_max_body_bytes(1024)
            .fetch(&format!("http://{addr}/stream"))
            .await
            .unwrap_err();
        match err {
            FallacyDetectorError::Fetch { message, .. } => {
                assert!(message.contains("response too large"), "{message}");
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_within_cap_is_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("z".repeat(1024), "text/plain"))
            .mount(&server)
            .await;

        let text = local_fetcher()
            .with_max_body_bytes(1024)
            .fetch(&server.uri())
            .await
            .unwrap();
        assert_eq!(text.len(), 1024);
    }

    #[tokio::test]
    async fn invalid_url_is_fetch_failure() {
        let err = local_fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FallacyDetectorError::Fetch { .. }));
    }

    #[tokio::test]
    async fn private_targets_blocked_by_default() {
        let fetcher = HttpFetcher::new(TEST_AGENT, Duration::from_secs(5), false).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:8080/admin").await.unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }

    #[test]
    fn ssrf_classification() {
        let blocked = [
            "http://localhost/x",
            "http://10.0.0.5/x",
            "http://192.168.1.1/x",
            "http://[::1]/x",
            "http://printer.local/x",
            "file:///etc/passwd",
        ];
        for url in blocked {
            assert!(is_ssrf_target(&Url::parse(url).unwrap()), "{url} should be blocked");
        }

        let allowed = ["https://www.reuters.com/world/", "http://93.184.216.34/"];
        for url in allowed {
            assert!(!is_ssrf_target(&Url::parse(url).unwrap()), "{url} should be allowed");
        }
    }
}
