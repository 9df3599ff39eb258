//! Article search: topic + domain → ranked article hits.
//!
//! The pipeline talks to search through [`SearchGateway`]. The collaborator's
//! ranking is trusted as-is: no reordering or dedup happens here. Zero hits is
//! an ordinary outcome reported as [`FallacyDetectorError::NoResults`].

mod serper;

use async_trait::async_trait;
use tracing::{info, instrument};

use fallacydetector_shared::{ArticleRef, FallacyDetectorError, Result};

pub use serper::SerperSearch;

/// Opaque query → ranked results service.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Run `query` once and return hits in provider order, at most `max_results`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArticleRef>>;
}

/// Build the provider query, scoping to `domain` when one is given.
pub fn build_query(topic: &str, domain: &str) -> String {
    let domain = domain.trim();
    if domain.is_empty() {
        topic.to_string()
    } else {
        format!("site:{domain} {topic}")
    }
}

/// Resolve the best-ranked article for `topic` within `domain`.
pub async fn find_article(
    gateway: &dyn SearchGateway,
    topic: &str,
    domain: &str,
) -> Result<ArticleRef> {
    let mut hits = find_articles(gateway, topic, domain, 1).await?;
    // find_articles never returns an empty list
    Ok(hits.remove(0))
}

/// Resolve up to `count` ranked articles with a single search request.
#[instrument(skip(gateway))]
pub async fn find_articles(
    gateway: &dyn SearchGateway,
    topic: &str,
    domain: &str,
    count: usize,
) -> Result<Vec<ArticleRef>> {
    let query = build_query(topic, domain);
    info!(%query, "searching for articles");

    let mut hits = gateway.search(&query, count.max(1)).await?;
    if hits.is_empty() {
        return Err(FallacyDetectorError::NoResults { query });
    }

    hits.truncate(count.max(1));
    info!(
        hits = hits.len(),
        first = %hits[0].url,
        "search resolved articles"
    );
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Returns canned hits and records every query it receives.
    struct CannedSearch {
        hits: Vec<ArticleRef>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl CannedSearch {
        fn new(hits: Vec<ArticleRef>) -> Self {
            Self {
                hits,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchGateway for CannedSearch {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArticleRef>> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));
            Ok(self.hits.clone())
        }
    }

    fn hit(n: usize) -> ArticleRef {
        ArticleRef {
            url: format!("https://news.example.com/{n}"),
            title: format!("Story {n}"),
            snippet: String::new(),
        }
    }

    #[test]
    fn query_without_domain_is_topic() {
        assert_eq!(build_query("climate change policy", ""), "climate change policy");
        assert_eq!(build_query("climate change policy", "   "), "climate change policy");
    }

    #[test]
    fn query_with_domain_is_site_scoped() {
        assert_eq!(
            build_query("climate change policy", "whitehouse.gov"),
            "site:whitehouse.gov climate change policy"
        );
    }

    #[tokio::test]
    async fn find_article_takes_first_hit() {
        let search = CannedSearch::new(vec![hit(1), hit(2), hit(3)]);
        let article = find_article(&search, "tariffs", "reuters.com").await.unwrap();
        assert_eq!(article, hit(1));

        let queries = search.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], ("site:reuters.com tariffs".to_string(), 1));
    }

    #[tokio::test]
    async fn find_articles_keeps_provider_order() {
        let search = CannedSearch::new(vec![hit(3), hit(1), hit(2)]);
        let hits = find_articles(&search, "tariffs", "", 2).await.unwrap();
        assert_eq!(hits, vec![hit(3), hit(1)]);
    }

    #[tokio::test]
    async fn zero_hits_is_no_results() {
        let search = CannedSearch::new(vec![]);
        let err = find_article(&search, "tariffs", "example.com").await.unwrap_err();
        match err {
            FallacyDetectorError::NoResults { query } => {
                assert_eq!(query, "site:example.com tariffs");
            }
            other => panic!("expected NoResults, got {other:?}"),
        }
    }
}
