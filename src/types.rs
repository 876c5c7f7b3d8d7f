use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical article record produced by every source adapter.
///
/// The `url` is the global identity key: two articles with the same URL are
/// the same article regardless of any other field differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Raw upstream date encoding; resolved to a calendar date only by the
    /// date-window selector. Absent when no source field could be resolved.
    pub published_date: Option<String>,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub doi: Option<String>,
    #[serde(default)]
    pub source_id: String,
}

/// An article as persisted by the store, with its bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    pub article: Article,
    /// Date of first successful persistence; never changes afterwards.
    pub collected_date: NaiveDate,
    /// Set once the notifier confirms delivery; never cleared.
    pub sent_date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Feed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Invalid keyword pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Email error: {0}")]
    Email(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
