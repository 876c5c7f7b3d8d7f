//! RSS/Atom source adapter.
//!
//! Feed sources are not query-capable: `topics` is ignored and the feed's
//! recent window is returned wholesale, bounded by `limit`, for downstream
//! keyword filtering. The adapter defends against structurally invalid
//! documents: a feed that fails to parse outright gets one salvage attempt
//! over its complete entries, and per-entry extraction failures skip that
//! entry without touching the rest of the batch.

use crate::collectors::Collector;
use crate::config::RssSourceConfig;
use crate::dates::find_embedded_date;
use crate::fetcher::{FetchConfig, Fetcher};
use crate::types::{Article, Result};
use async_trait::async_trait;
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

pub struct RssCollector {
    source_id: String,
    name: String,
    url: String,
    headers: BTreeMap<String, String>,
    scan_dates_in_text: bool,
    fetcher: Fetcher,
}

impl RssCollector {
    pub fn new(source_id: &str, config: &RssSourceConfig, fetch: FetchConfig) -> Result<Self> {
        Ok(Self {
            source_id: source_id.to_string(),
            name: config.name.clone().unwrap_or_else(|| source_id.to_string()),
            url: config.url.clone(),
            headers: config.headers.clone(),
            scan_dates_in_text: config.scan_dates_in_text,
            fetcher: Fetcher::new(&fetch.with_rate_limit(config.rate_limit))?,
        })
    }

    /// Parse the document and map its entries, applying the partial-success
    /// policy throughout.
    fn extract_all(&self, content: &str, limit: usize) -> Vec<Article> {
        let entries = match parser::parse(content.as_bytes()) {
            Ok(feed) => feed.entries,
            Err(e) => {
                warn!(
                    source = %self.source_id,
                    error = %e,
                    "feed failed to parse, attempting to salvage complete entries"
                );
                match salvage_feed(content) {
                    Some(feed) if !feed.entries.is_empty() => {
                        info!(
                            source = %self.source_id,
                            salvaged = feed.entries.len(),
                            "recovered entries from damaged feed"
                        );
                        feed.entries
                    }
                    _ => {
                        error!(source = %self.source_id, "feed yielded no extractable entries");
                        return Vec::new();
                    }
                }
            }
        };

        let total = entries.len();
        let articles: Vec<Article> = entries
            .into_iter()
            .take(limit)
            .filter_map(|entry| self.extract_entry(entry))
            .collect();

        debug!(
            source = %self.source_id,
            total,
            extracted = articles.len(),
            "feed entries extracted"
        );
        articles
    }

    /// Map one feed entry; `None` skips just this entry.
    fn extract_entry(&self, entry: Entry) -> Option<Article> {
        let url = match entry.links.first() {
            Some(link) => link.href.clone(),
            None => {
                warn!(
                    source = %self.source_id,
                    entry = %entry.id,
                    "skipping feed entry without a link"
                );
                return None;
            }
        };

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        let summary = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .or_else(|| {
                entry
                    .content
                    .as_ref()
                    .and_then(|c| c.body.as_ref())
                    .map(|body| body.trim().to_string())
            })
            .unwrap_or_default();

        let published_date = self.extract_date(&entry, &title, &summary);

        Some(Article {
            title,
            url,
            abstract_text: summary,
            authors: entry
                .authors
                .into_iter()
                .map(|person| person.name)
                .filter(|name| !name.trim().is_empty())
                .collect(),
            published_date,
            journal: self.name.clone(),
            keywords: entry
                .categories
                .into_iter()
                .map(|category| category.term)
                .filter(|term| !term.trim().is_empty())
                .collect(),
            doi: None,
            source_id: self.source_id.clone(),
        })
    }

    /// Date extraction priority: machine-parsed `published`, then `updated`,
    /// then an ISO date embedded in title/summary text for sources known to
    /// omit date fields. Absent otherwise, never guessed.
    fn extract_date(&self, entry: &Entry, title: &str, summary: &str) -> Option<String> {
        if let Some(published) = entry.published {
            return Some(published.format("%Y-%m-%d").to_string());
        }
        if let Some(updated) = entry.updated {
            return Some(updated.format("%Y-%m-%d").to_string());
        }

        if self.scan_dates_in_text {
            for text in [title, summary] {
                if let Some(date) = find_embedded_date(text) {
                    return Some(date);
                }
            }
        }

        warn!(source = %self.source_id, title, "no publication date on feed entry");
        None
    }
}

#[async_trait]
impl Collector for RssCollector {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, _topics: &[String], limit: usize) -> Vec<Article> {
        info!(source = %self.source_id, url = %self.url, "collecting from feed");
        let content = match self.fetcher.get(&self.url, &[], &self.headers).await {
            Ok(content) => content,
            Err(e) => {
                error!(source = %self.source_id, error = %e, "feed fetch failed");
                return Vec::new();
            }
        };

        let articles = self.extract_all(&content, limit);
        info!(source = %self.source_id, count = articles.len(), "feed collection finished");
        articles
    }
}

/// Truncate the document after its last complete entry and close the
/// envelope, keeping whatever parsed cleanly before the damage.
fn salvage_feed(content: &str) -> Option<Feed> {
    for (end_tag, closer) in [("</item>", "</channel>\n</rss>"), ("</entry>", "</feed>")] {
        if let Some(pos) = content.rfind(end_tag) {
            let mut doc = content[..pos + end_tag.len()].to_string();
            doc.push_str(closer);
            if let Ok(feed) = parser::parse(doc.as_bytes()) {
                return Some(feed);
            }
        }
    }
    None
}
