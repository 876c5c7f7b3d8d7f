//! The collection pipeline.
//!
//! One run walks every configured source in order, concatenates the batches,
//! applies the keyword filter and the date window, and hands the remainder
//! to the store, which returns the never-seen subset. A failure in one
//! source or one persistence call reduces the output but never aborts the
//! run.

use crate::collectors::{ApiCollector, Collector, RssCollector, WebCollector};
use crate::config::Config;
use crate::dates;
use crate::fetcher::FetchConfig;
use crate::filter::KeywordFilter;
use crate::storage::ArticleStore;
use crate::types::{Article, Result};
use chrono::NaiveDate;
use tracing::{error, info};

pub struct Pipeline {
    collectors: Vec<Box<dyn Collector>>,
    filter: KeywordFilter,
    store: ArticleStore,
    topics: Vec<String>,
    max_per_source: usize,
}

impl Pipeline {
    pub fn new(
        collectors: Vec<Box<dyn Collector>>,
        filter: KeywordFilter,
        store: ArticleStore,
        topics: Vec<String>,
        max_per_source: usize,
    ) -> Self {
        Self {
            collectors,
            filter,
            store,
            topics,
            max_per_source,
        }
    }

    /// Build the pipeline from loaded configuration. An invalid matching
    /// pattern fails here, before any source is contacted; a misconfigured
    /// source is logged and skipped so one bad definition cannot take the
    /// run down.
    pub fn from_config(config: &Config, store: ArticleStore) -> Result<Self> {
        let filter = KeywordFilter::new(&config.keywords.keywords, &config.keywords.matching)?;

        let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

        for (source_id, source) in &config.sources.api_sources {
            match ApiCollector::new(source_id, source, FetchConfig::default()) {
                Ok(collector) => collectors.push(Box::new(collector)),
                Err(e) => error!(source = %source_id, error = %e, "skipping API source"),
            }
        }
        for (source_id, source) in &config.sources.rss_sources {
            match RssCollector::new(source_id, source, FetchConfig::default()) {
                Ok(collector) => collectors.push(Box::new(collector)),
                Err(e) => error!(source = %source_id, error = %e, "skipping RSS source"),
            }
        }
        for (source_id, source) in &config.sources.web_sources {
            match WebCollector::new(source_id, source, FetchConfig::default()) {
                Ok(collector) => collectors.push(Box::new(collector)),
                Err(e) => error!(source = %source_id, error = %e, "skipping web source"),
            }
        }

        info!(sources = collectors.len(), "pipeline assembled");
        Ok(Self::new(
            collectors,
            filter,
            store,
            config.keywords.keywords.clone(),
            config.app.run.max_articles_per_source,
        ))
    }

    /// Run one collection pass and return the articles never seen before.
    pub async fn run(&self, target_day: NaiveDate) -> Vec<Article> {
        self.store.cleanup_expired().await;

        let mut all = Vec::new();
        for collector in &self.collectors {
            let batch = collector.collect(&self.topics, self.max_per_source).await;
            info!(
                source = collector.source_id(),
                count = batch.len(),
                "source batch collected"
            );
            all.extend(batch);
        }
        info!(total = all.len(), "all sources collected");

        let matched = self.filter.filter_articles(all);
        let in_window = dates::filter_by_day(matched, target_day);
        info!(
            count = in_window.len(),
            %target_day,
            "articles within the target day"
        );

        let fresh = self.store.save_new(&in_window).await;
        info!(count = fresh.len(), "new articles after dedup");
        fresh
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }
}
