pub mod api;
pub mod rss;
pub mod web;

pub use api::ApiCollector;
pub use rss::RssCollector;
pub use web::WebCollector;

use crate::types::Article;
use async_trait::async_trait;

/// One configured upstream source (API, feed, or web page).
///
/// Each implementation converts its source's native representation into
/// canonical [`Article`] values and isolates upstream irregularities from the
/// rest of the pipeline.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Configured identifier of this source.
    fn source_id(&self) -> &str;

    /// Human-readable name for this source.
    fn source_name(&self) -> &str;

    /// Fetch up to `limit` articles.
    ///
    /// `topics` drives server-side query construction for query-capable
    /// sources and is ignored by pure feed sources. Never fails: transport,
    /// parse, and per-item errors are handled internally, logged, and
    /// contribute zero articles.
    async fn collect(&self, topics: &[String], limit: usize) -> Vec<Article>;
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join topics into one `"a" OR "b"` query term, quoting each.
pub(crate) fn quoted_query(topics: &[String]) -> String {
    topics
        .iter()
        .map(|topic| format!("\"{}\"", topic))
        .collect::<Vec<_>>()
        .join(" OR ")
}
