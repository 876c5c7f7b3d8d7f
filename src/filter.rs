//! Keyword filtering of canonical articles.
//!
//! The filter concatenates the configured article fields into one search
//! buffer per article and evaluates every keyword against it. Patterns are
//! compiled once at construction; an invalid pattern is a construction
//! error, since silently matching nothing would be worse than failing the
//! run at startup.

use crate::types::{Article, Result, TrackerError};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// The trimmed search buffer must equal the keyword.
    Exact,
    /// The keyword must occur in the buffer; `whole_word` restricts the
    /// occurrence to word boundaries.
    #[default]
    Contain,
    /// The keyword is a regular expression searched against the buffer.
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    /// true: any keyword suffices (OR); false: every keyword must match (AND).
    #[serde(default = "default_match_any")]
    pub match_any: bool,
    /// Article fields searched, in order; list fields are space-joined.
    #[serde(default = "default_include_fields")]
    pub include_fields: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            match_type: MatchType::default(),
            case_sensitive: false,
            whole_word: false,
            match_any: default_match_any(),
            include_fields: default_include_fields(),
        }
    }
}

fn default_match_any() -> bool {
    true
}

fn default_include_fields() -> Vec<String> {
    vec![
        "title".to_string(),
        "abstract".to_string(),
        "keywords".to_string(),
    ]
}

/// One keyword, compiled for the configured match mode.
enum KeywordMatcher {
    /// Buffer equality, on the case-normalized buffer.
    Exact(String),
    /// Literal substring, on the case-normalized buffer.
    Substring(String),
    /// Word-boundary-delimited occurrence.
    WholeWord(Regex),
    /// User-supplied pattern.
    Pattern(Regex),
}

pub struct KeywordFilter {
    matchers: Vec<KeywordMatcher>,
    case_sensitive: bool,
    match_any: bool,
    include_fields: Vec<String>,
}

impl KeywordFilter {
    pub fn new(keywords: &[String], config: &MatchingConfig) -> Result<Self> {
        let mut matchers = Vec::with_capacity(keywords.len());

        for keyword in keywords {
            let matcher = match config.match_type {
                MatchType::Regex => {
                    let pattern = RegexBuilder::new(keyword)
                        .case_insensitive(!config.case_sensitive)
                        .build()
                        .map_err(|e| TrackerError::InvalidPattern {
                            pattern: keyword.clone(),
                            source: e,
                        })?;
                    KeywordMatcher::Pattern(pattern)
                }
                // `exact` means the whole buffer equals this keyword, with or
                // without `whole_word`.
                MatchType::Exact => {
                    KeywordMatcher::Exact(normalize(keyword, config.case_sensitive))
                }
                MatchType::Contain if config.whole_word => {
                    let pattern =
                        RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
                            .case_insensitive(!config.case_sensitive)
                            .build()
                            .map_err(|e| TrackerError::InvalidPattern {
                                pattern: keyword.clone(),
                                source: e,
                            })?;
                    KeywordMatcher::WholeWord(pattern)
                }
                MatchType::Contain => {
                    KeywordMatcher::Substring(normalize(keyword, config.case_sensitive))
                }
            };
            matchers.push(matcher);
        }

        Ok(Self {
            matchers,
            case_sensitive: config.case_sensitive,
            match_any: config.match_any,
            include_fields: config.include_fields.clone(),
        })
    }

    /// Keep the articles matching the configured policy, preserving input
    /// order. Article content is never mutated.
    pub fn filter_articles(&self, articles: Vec<Article>) -> Vec<Article> {
        let total = articles.len();
        let matched: Vec<Article> = articles
            .into_iter()
            .filter(|article| self.matches(article))
            .collect();
        info!(total, matched = matched.len(), "keyword filter applied");
        matched
    }

    pub fn matches(&self, article: &Article) -> bool {
        let buffer = self.search_buffer(article);
        let normalized = if self.case_sensitive {
            buffer.clone()
        } else {
            buffer.to_lowercase()
        };

        let mut results = self.matchers.iter().map(|matcher| match matcher {
            KeywordMatcher::Exact(keyword) => normalized.trim() == keyword.as_str(),
            KeywordMatcher::Substring(keyword) => normalized.contains(keyword.as_str()),
            KeywordMatcher::WholeWord(pattern) | KeywordMatcher::Pattern(pattern) => {
                pattern.is_match(&buffer)
            }
        });

        if self.match_any {
            results.any(|matched| matched)
        } else {
            results.all(|matched| matched)
        }
    }

    /// Concatenate the selected fields into one search buffer, list fields
    /// flattened to space-joined text.
    fn search_buffer(&self, article: &Article) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.include_fields.len());
        for field in &self.include_fields {
            match field.as_str() {
                "title" => parts.push(article.title.clone()),
                "abstract" => parts.push(article.abstract_text.clone()),
                "authors" => parts.push(article.authors.join(" ")),
                "keywords" => parts.push(article.keywords.join(" ")),
                "journal" => parts.push(article.journal.clone()),
                "url" => parts.push(article.url.clone()),
                "doi" => {
                    if let Some(doi) = &article.doi {
                        parts.push(doi.clone());
                    }
                }
                "source_id" => parts.push(article.source_id.clone()),
                _ => {}
            }
        }
        parts.join(" ")
    }
}

fn normalize(keyword: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        keyword.to_string()
    } else {
        keyword.to_lowercase()
    }
}
