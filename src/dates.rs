//! Tolerant calendar-date resolution and the target-day window.
//!
//! Upstream sources encode publication dates inconsistently: RFC 3339
//! timestamps, RFC 2822 feed dates, bare ISO dates, slash-delimited and
//! named-month forms, or free text with a date buried inside. `resolve_date`
//! tries each in priority order and returns an explicit `None` on total
//! failure; callers must branch on that outcome rather than guess.
//!
//! All comparisons are timezone-naive calendar dates. A source reporting
//! dates in a different timezone than the run's clock can land in the wrong
//! window near midnight; this is a known limitation, not corrected here.

use crate::types::Article;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Resolve a raw date string to a calendar date, or `None` if no encoding
/// matches.
pub fn resolve_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    // Last resort: an ISO date embedded somewhere in the text.
    find_embedded_date(text)
        .and_then(|candidate| NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").ok())
}

/// Find a `YYYY-MM-DD` pattern embedded in arbitrary text.
pub fn find_embedded_date(text: &str) -> Option<String> {
    ISO_DATE.find(text).map(|m| m.as_str().to_string())
}

/// Keep only articles published on the target calendar day.
///
/// Articles whose date is absent or unresolvable are dropped, never assumed
/// to match; each drop is logged as a data-quality signal.
pub fn filter_by_day(articles: Vec<Article>, target: NaiveDate) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|article| {
            match article.published_date.as_deref().and_then(resolve_date) {
                Some(date) => date == target,
                None => {
                    debug!(
                        url = %article.url,
                        raw = article.published_date.as_deref().unwrap_or(""),
                        "excluding article with unresolvable publication date"
                    );
                    false
                }
            }
        })
        .collect()
}
