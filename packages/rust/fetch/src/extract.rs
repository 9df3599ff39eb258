//! Readable-text extraction from article HTML.
//!
//! Picks the main content container, drops page chrome, and converts the
//! remainder to Markdown-flavored text with `htmd`. Whitespace is left as-is;
//! bounding and collapsing happen later in the normalizer.

use scraper::{Html, Selector};
use tracing::debug;

use fallacydetector_shared::{FallacyDetectorError, Result};

/// Content containers tried in priority order; `body` is the fallback.
const CONTENT_SELECTORS: [&str; 6] = [
    "article",
    "[itemprop=\"articleBody\"]",
    "main",
    "[role=\"main\"]",
    ".article-body",
    ".content",
];

/// Elements never treated as article prose.
const CHROME_TAGS: [&str; 12] = [
    "script", "style", "noscript", "iframe", "svg", "nav", "header", "footer", "aside", "form",
    "button", "figure",
];

/// Extract readable text from a full HTML document.
pub fn extract_article_text(html: &str) -> Result<String> {
    let content_html = extract_content_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(CHROME_TAGS.to_vec())
        .build();

    let text = converter
        .convert(&content_html)
        .map_err(|e| FallacyDetectorError::validation(format!("html conversion failed: {e}")))?;

    debug!(html_len = html.len(), text_len = text.len(), "extracted article text");
    Ok(text)
}

/// Inner HTML of the best content container.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    for sel_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    if let Ok(body_sel) = Selector::parse("body") {
        if let Some(body) = doc.select(&body_sel).next() {
            return body.inner_html();
        }
    }

    html.to_string()
}
