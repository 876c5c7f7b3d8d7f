//! Configuration loading for the tracker.
//!
//! Three YAML files live in the configuration directory: `config.yaml`
//! (run, storage, and email settings), `journals.yaml` (source definitions
//! grouped by adapter kind), and `keywords.yaml` (topic keywords plus the
//! matching policy).

use crate::filter::MatchingConfig;
use crate::types::{Result, TrackerError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_per_source")]
    pub max_articles_per_source: usize,
    #[serde(default = "default_max_per_email")]
    pub max_articles_per_email: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_articles_per_source: default_max_per_source(),
            max_articles_per_email: default_max_per_email(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EmailConfig {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct KeywordsConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Source definitions from `journals.yaml`, keyed by source id.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub api_sources: BTreeMap<String, ApiSourceConfig>,
    #[serde(default)]
    pub rss_sources: BTreeMap<String, RssSourceConfig>,
    #[serde(default)]
    pub web_sources: BTreeMap<String, WebSourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSourceConfig {
    pub name: Option<String>,
    pub base_url: String,
    /// Which provider response mapping to apply: `arxiv`, `springer`, or
    /// `elsevier`.
    pub parser: String,
    #[serde(default)]
    pub search_params: BTreeMap<String, String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RssSourceConfig {
    pub name: Option<String>,
    pub url: String,
    /// Extra request headers; some publisher feeds reject the default
    /// user agent.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Scan title/summary text for an embedded ISO date when the feed
    /// carries no date fields.
    #[serde(default)]
    pub scan_dates_in_text: bool,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSourceConfig {
    pub name: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub search_params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub selectors: SelectorConfig,
    /// Base URL used to absolutize relative article links.
    pub link_base: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
}

/// CSS selectors used to pull article fields out of a results page.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_container_selector")]
    pub article_container: String,
    #[serde(default = "default_title_selector")]
    pub title: String,
    #[serde(default = "default_link_selector")]
    pub link: String,
    #[serde(default = "default_abstract_selector", rename = "abstract")]
    pub abstract_text: String,
    #[serde(default = "default_authors_selector")]
    pub authors: String,
    #[serde(default = "default_date_selector")]
    pub date: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            article_container: default_container_selector(),
            title: default_title_selector(),
            link: default_link_selector(),
            abstract_text: default_abstract_selector(),
            authors: default_authors_selector(),
            date: default_date_selector(),
        }
    }
}

/// The three configuration files, loaded together.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub app: AppConfig,
    pub sources: SourcesConfig,
    pub keywords: KeywordsConfig,
}

impl Config {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let app = load_yaml(&config_dir.join("config.yaml"))?;
        let sources = load_yaml(&config_dir.join("journals.yaml"))?;
        let keywords: KeywordsConfig = load_yaml(&config_dir.join("keywords.yaml"))?;

        if keywords.keywords.is_empty() {
            return Err(TrackerError::Config(
                "no keywords configured in keywords.yaml".to_string(),
            ));
        }

        info!(config_dir = %config_dir.display(), "configuration loaded");
        Ok(Self {
            app,
            sources,
            keywords,
        })
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TrackerError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_yaml::from_str(&raw)?)
}

fn default_max_per_source() -> usize {
    100
}

fn default_max_per_email() -> usize {
    50
}

fn default_database_path() -> String {
    "data/articles.db".to_string()
}

fn default_retention_days() -> i64 {
    30
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_container_selector() -> String {
    "div.article".to_string()
}

fn default_title_selector() -> String {
    "h2".to_string()
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_abstract_selector() -> String {
    "div.abstract".to_string()
}

fn default_authors_selector() -> String {
    "div.authors".to_string()
}

fn default_date_selector() -> String {
    "div.date".to_string()
}
