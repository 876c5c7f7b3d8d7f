//! Web-scrape source adapter.
//!
//! Fetches a configured results page with `{keywords}` substituted into the
//! query parameters, then applies configured CSS selectors to extract one
//! article per container element. A missed selector yields an empty field,
//! not a failed item; an item is only dropped when its link selector misses,
//! since the URL is the article's identity.

use crate::collectors::{normalize_whitespace, quoted_query, Collector};
use crate::config::WebSourceConfig;
use crate::fetcher::{FetchConfig, Fetcher};
use crate::types::{Article, Result, TrackerError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, error, info};
use url::Url;

struct Selectors {
    container: Selector,
    title: Selector,
    link: Selector,
    abstract_text: Selector,
    authors: Selector,
    date: Selector,
}

pub struct WebCollector {
    source_id: String,
    name: String,
    base_url: String,
    link_base: Option<String>,
    search_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    selectors: Selectors,
    fetcher: Fetcher,
}

impl WebCollector {
    pub fn new(source_id: &str, config: &WebSourceConfig, fetch: FetchConfig) -> Result<Self> {
        let selectors = Selectors {
            container: parse_selector(&config.selectors.article_container)?,
            title: parse_selector(&config.selectors.title)?,
            link: parse_selector(&config.selectors.link)?,
            abstract_text: parse_selector(&config.selectors.abstract_text)?,
            authors: parse_selector(&config.selectors.authors)?,
            date: parse_selector(&config.selectors.date)?,
        };

        Ok(Self {
            source_id: source_id.to_string(),
            name: config.name.clone().unwrap_or_else(|| source_id.to_string()),
            base_url: config.base_url.clone(),
            link_base: config.link_base.clone(),
            search_params: config.search_params.clone(),
            headers: config.headers.clone(),
            selectors,
            fetcher: Fetcher::new(&fetch.with_rate_limit(config.rate_limit))?,
        })
    }

    /// Substitute the topic query into every parameter value carrying the
    /// `{keywords}` placeholder.
    fn build_params(&self, topics: &[String]) -> Vec<(String, String)> {
        let query = quoted_query(topics);
        self.search_params
            .iter()
            .map(|(key, value)| (key.clone(), value.replace("{keywords}", &query)))
            .collect()
    }

    fn parse_page(&self, html: &str, limit: usize) -> Vec<Article> {
        let document = Html::parse_document(html);
        let mut articles = Vec::new();

        for container in document.select(&self.selectors.container).take(limit) {
            let href = container
                .select(&self.selectors.link)
                .next()
                .and_then(|element| element.value().attr("href"))
                .unwrap_or_default();
            if href.is_empty() {
                debug!(source = %self.source_id, "skipping result without a link");
                continue;
            }
            let url = self.absolutize(href);

            let authors_text = first_text(&container, &self.selectors.authors);
            let authors: Vec<String> = authors_text
                .split(',')
                .map(str::trim)
                .filter(|author| !author.is_empty())
                .map(str::to_string)
                .collect();

            let date_text = first_text(&container, &self.selectors.date);

            articles.push(Article {
                title: first_text(&container, &self.selectors.title),
                url,
                abstract_text: first_text(&container, &self.selectors.abstract_text),
                authors,
                published_date: if date_text.is_empty() {
                    None
                } else {
                    Some(date_text)
                },
                journal: self.name.clone(),
                keywords: Vec::new(),
                doi: None,
                source_id: self.source_id.clone(),
            });
        }

        articles
    }

    /// Resolve a relative article link against the configured base.
    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        if let Some(base) = &self.link_base {
            if let Ok(joined) = Url::parse(base).and_then(|base| base.join(href)) {
                return joined.to_string();
            }
        }
        href.to_string()
    }
}

#[async_trait]
impl Collector for WebCollector {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, topics: &[String], limit: usize) -> Vec<Article> {
        info!(source = %self.source_id, "collecting from web source");
        let params = self.build_params(topics);
        let html = match self.fetcher.get(&self.base_url, &params, &self.headers).await {
            Ok(html) => html,
            Err(e) => {
                error!(source = %self.source_id, error = %e, "page fetch failed");
                return Vec::new();
            }
        };

        let articles = self.parse_page(&html, limit);
        info!(source = %self.source_id, count = articles.len(), "web collection finished");
        articles
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| TrackerError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn first_text(container: &ElementRef, selector: &Selector) -> String {
    container
        .select(selector)
        .next()
        .map(|element| normalize_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;

    fn collector() -> WebCollector {
        let config = WebSourceConfig {
            name: Some("ScienceDirect".to_string()),
            base_url: "https://www.sciencedirect.com/search".to_string(),
            search_params: [("qs".to_string(), "{keywords}".to_string())].into(),
            headers: Default::default(),
            selectors: SelectorConfig {
                article_container: "div.result-item".to_string(),
                title: "h2".to_string(),
                link: "h2 a".to_string(),
                abstract_text: "div.abstract-text".to_string(),
                authors: "div.Authors".to_string(),
                date: "div.publication-date".to_string(),
            },
            link_base: Some("https://www.sciencedirect.com".to_string()),
            rate_limit: 0.0,
        };
        WebCollector::new("sciencedirect", &config, FetchConfig::default()).unwrap()
    }

    const RESULTS_PAGE: &str = r#"<html><body>
      <div class="result-item">
        <h2><a href="/science/article/pii/1">Battery   cathode design</a></h2>
        <div class="Authors">J. Doe, R. Roe</div>
        <div class="abstract-text">We report a cathode.</div>
        <div class="publication-date">May 1, 2024</div>
      </div>
      <div class="result-item">
        <h2><a href="https://elsewhere.example.com/a/2">Absolute link item</a></h2>
      </div>
      <div class="result-item">
        <h2>No link at all</h2>
      </div>
    </body></html>"#;

    #[test]
    fn extracts_fields_and_absolutizes_links() {
        let articles = collector().parse_page(RESULTS_PAGE, 100);
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Battery cathode design");
        assert_eq!(
            first.url,
            "https://www.sciencedirect.com/science/article/pii/1"
        );
        assert_eq!(first.authors, vec!["J. Doe", "R. Roe"]);
        assert_eq!(first.abstract_text, "We report a cathode.");
        assert_eq!(first.published_date.as_deref(), Some("May 1, 2024"));
        assert_eq!(first.journal, "ScienceDirect");
    }

    #[test]
    fn absolute_links_pass_through() {
        let articles = collector().parse_page(RESULTS_PAGE, 100);
        assert_eq!(articles[1].url, "https://elsewhere.example.com/a/2");
        // Missed selectors degrade to empty fields, not failures.
        assert!(articles[1].abstract_text.is_empty());
        assert!(articles[1].authors.is_empty());
        assert!(articles[1].published_date.is_none());
    }

    #[test]
    fn limit_caps_the_containers() {
        let articles = collector().parse_page(RESULTS_PAGE, 1);
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn keywords_placeholder_is_substituted() {
        let params = collector().build_params(&["battery".to_string(), "solar".to_string()]);
        assert_eq!(params[0].0, "qs");
        assert_eq!(params[0].1, r#""battery" OR "solar""#);
    }

    #[test]
    fn invalid_selector_fails_construction() {
        let config = WebSourceConfig {
            name: None,
            base_url: "https://example.com".to_string(),
            search_params: Default::default(),
            headers: Default::default(),
            selectors: SelectorConfig {
                article_container: "div..broken((".to_string(),
                ..Default::default()
            },
            link_base: None,
            rate_limit: 1.0,
        };
        assert!(WebCollector::new("bad", &config, FetchConfig::default()).is_err());
    }
}
