//! Serper (Google Search) backed [`SearchGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use fallacydetector_shared::{ArticleRef, Configuration, FallacyDetectorError, Result};

use crate::SearchGateway;

/// Default timeout in seconds for a search request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Search gateway backed by the Serper API.
pub struct SerperSearch {
    client: Client,
    endpoint: String,
    api_key: HeaderValue,
    results_per_query: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearch {
    /// Create a client for `endpoint` authenticated with `api_key`.
    pub fn new(endpoint: &str, api_key: &str, results_per_query: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                FallacyDetectorError::Search(format!("failed to build HTTP client: {e}"))
            })?;
        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|e| FallacyDetectorError::config(format!("invalid search API key: {e}")))?;
        api_key.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            results_per_query: results_per_query.max(1),
        })
    }

    /// Create a client from validated run configuration.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Self::new(
            config.search_endpoint(),
            config.credentials().search_key(),
            config.results_per_query() as usize,
        )
    }
}

#[async_trait]
impl SearchGateway for SerperSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArticleRef>> {
        let num = max_results.max(self.results_per_query);
        debug!(query, num, endpoint = %self.endpoint, "serper request");

        let body = serde_json::json!({
            "q": query,
            "num": num,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", self.api_key.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| FallacyDetectorError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(FallacyDetectorError::Search(format!("HTTP {status}: {detail}")));
        }

        let data: SerperResponse = response
            .json()
            .await
            .map_err(|e| FallacyDetectorError::Search(format!("invalid response: {e}")))?;

        let hits = data
            .organic
            .into_iter()
            .take(max_results)
            .map(into_article_ref)
            .collect::<Result<Vec<_>>>()?;

        info!(query, count = hits.len(), "serper search complete");
        Ok(hits)
    }
}

/// Validate a raw hit's link and convert it.
fn into_article_ref(raw: SerperResult) -> Result<ArticleRef> {
    let url = Url::parse(raw.link.trim()).map_err(|e| {
        FallacyDetectorError::Search(format!("result has invalid link '{}': {e}", raw.link))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FallacyDetectorError::Search(format!(
            "result link is not http(s): {url}"
        )));
    }

    Ok(ArticleRef {
        url: url.to_string(),
        title: raw.title.trim().to_string(),
        snippet: raw.snippet.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> SerperSearch {
        SerperSearch::new(&format!("{}/search", server.uri()), "test-serper-key", 5).unwrap()
    }

    #[tokio::test]
    async fn returns_organic_results_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "test-serper-key"))
            .and(body_json(serde_json::json!({
                "q": "site:whitehouse.gov climate change policy",
                "num": 5,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [
                    {
                        "link": "https://www.whitehouse.gov/a",
                        "title": "Fact Sheet",
                        "snippet": "..."
                    },
                    {"link": "https://www.whitehouse.gov/b", "title": "Remarks"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hits = gateway(&server)
            .search("site:whitehouse.gov climate change policy", 5)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://www.whitehouse.gov/a");
        assert_eq!(hits[0].title, "Fact Sheet");
        assert_eq!(hits[1].title, "Remarks");
        assert!(hits[1].snippet.is_empty());
    }

    #[tokio::test]
    async fn missing_organic_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "searchParameters": {"q": "nothing"}
            })))
            .mount(&server)
            .await;

        let hits = gateway(&server).search("nothing", 1).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_search_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = gateway(&server).search("tariffs", 1).await.unwrap_err();
        assert!(matches!(err, FallacyDetectorError::Search(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn malformed_body_is_search_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server).search("tariffs", 1).await.unwrap_err();
        assert!(matches!(err, FallacyDetectorError::Search(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_search_failure() {
        let search = SerperSearch::new("http://127.0.0.1:9/search", "key", 1).unwrap();
        let err = search.search("tariffs", 1).await.unwrap_err();
        assert!(matches!(err, FallacyDetectorError::Search(_)));
    }

    #[test]
    fn unsendable_key_fails_at_construction() {
        let err = SerperSearch::new("http://127.0.0.1:9/search", "key\r\nX-Injected: 1", 1)
            .err()
            .unwrap();
        assert!(matches!(err, FallacyDetectorError::Config { .. }));
    }

    #[test]
    fn invalid_link_is_rejected() {
        let raw = SerperResult {
            link: "not a url".into(),
            title: "t".into(),
            snippet: String::new(),
        };
        assert!(into_article_ref(raw).is_err());

        let raw = SerperResult {
            link: "ftp://example.com/file".into(),
            title: "t".into(),
            snippet: String::new(),
        };
        assert!(into_article_ref(raw).is_err());
    }
}
