//! Dedup and retention store.
//!
//! The only stateful component: a SQLite table of articles keyed uniquely by
//! URL. `save_new` returns the never-seen subset, `mark_sent` records
//! confirmed deliveries, and `cleanup_expired` enforces the retention
//! window. Every operation catches storage errors, logs them, and returns
//! its safe default, so callers treat a storage error as "nothing changed".

use crate::types::{Article, Result, StoredArticle, TrackerError};
use chrono::{Duration, Local, NaiveDate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::Path;
use tracing::{error, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        abstract TEXT NOT NULL DEFAULT '',
        authors TEXT NOT NULL DEFAULT '[]',
        published_date TEXT,
        journal TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '[]',
        doi TEXT,
        source_id TEXT NOT NULL DEFAULT '',
        collected_date TEXT NOT NULL,
        sent_date TEXT
    )
    "#,
];

pub struct ArticleStore {
    pool: SqlitePool,
    retention_days: i64,
}

impl ArticleStore {
    pub async fn open(db_path: &Path, retention_days: i64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        for migration in MIGRATIONS {
            sqlx::query(migration).execute(&pool).await?;
        }

        info!(db = %db_path.display(), retention_days, "article store opened");
        Ok(Self {
            pool,
            retention_days,
        })
    }

    /// Persist the never-seen articles and return them; articles whose URL
    /// is already known are skipped and their stored fields left untouched.
    pub async fn save_new(&self, articles: &[Article]) -> Vec<Article> {
        self.save_new_dated(articles, Local::now().date_naive()).await
    }

    /// `save_new` with an explicit collection date.
    pub async fn save_new_dated(
        &self,
        articles: &[Article],
        collected: NaiveDate,
    ) -> Vec<Article> {
        match self.try_save_new(articles, collected).await {
            Ok(fresh) => {
                info!(saved = fresh.len(), "saved new articles");
                fresh
            }
            Err(e) => {
                error!(error = %e, "saving articles failed, nothing persisted");
                Vec::new()
            }
        }
    }

    async fn try_save_new(
        &self,
        articles: &[Article],
        collected: NaiveDate,
    ) -> Result<Vec<Article>> {
        let mut tx = self.pool.begin().await?;
        let mut fresh = Vec::new();

        for article in articles {
            // A failure on one record must not prevent attempting the rest.
            let lists = serde_json::to_string(&article.authors)
                .and_then(|authors| {
                    serde_json::to_string(&article.keywords).map(|keywords| (authors, keywords))
                });
            let (authors_json, keywords_json) = match lists {
                Ok(lists) => lists,
                Err(e) => {
                    warn!(url = %article.url, error = %e, "skipping article with unserializable lists");
                    continue;
                }
            };

            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO articles
                    (title, url, abstract, authors, published_date,
                     journal, keywords, doi, source_id, collected_date)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.title)
            .bind(&article.url)
            .bind(&article.abstract_text)
            .bind(authors_json)
            .bind(&article.published_date)
            .bind(&article.journal)
            .bind(keywords_json)
            .bind(&article.doi)
            .bind(&article.source_id)
            .bind(collected.format(DATE_FORMAT).to_string())
            .execute(&mut *tx)
            .await;

            match result {
                // rows_affected == 0 means the URL is already known; the
                // first-seen field values win.
                Ok(done) if done.rows_affected() > 0 => fresh.push(article.clone()),
                Ok(_) => {}
                Err(e) => {
                    warn!(url = %article.url, error = %e, "skipping article that failed to persist");
                }
            }
        }

        tx.commit().await?;
        Ok(fresh)
    }

    /// Record that the given URLs were delivered. Unknown URLs are ignored;
    /// re-marking a URL keeps the first call's date.
    pub async fn mark_sent(&self, urls: &[String]) {
        self.mark_sent_dated(urls, Local::now().date_naive()).await
    }

    /// `mark_sent` with an explicit sent date.
    pub async fn mark_sent_dated(&self, urls: &[String], sent: NaiveDate) {
        if let Err(e) = self.try_mark_sent(urls, sent).await {
            error!(error = %e, "marking articles as sent failed");
        }
    }

    async fn try_mark_sent(&self, urls: &[String], sent: NaiveDate) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for url in urls {
            sqlx::query(
                "UPDATE articles SET sent_date = ? WHERE url = ? AND sent_date IS NULL",
            )
            .bind(sent.format(DATE_FORMAT).to_string())
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!(count = urls.len(), "marked articles as sent");
        Ok(())
    }

    /// Rows with no `sent_date`, most recently collected first, capped at
    /// `limit`.
    pub async fn list_unsent(&self, limit: usize) -> Vec<StoredArticle> {
        match self.try_list_unsent(limit).await {
            Ok(articles) => articles,
            Err(e) => {
                error!(error = %e, "listing unsent articles failed");
                Vec::new()
            }
        }
    }

    async fn try_list_unsent(&self, limit: usize) -> Result<Vec<StoredArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT title, url, abstract, authors, published_date,
                   journal, keywords, doi, source_id, collected_date, sent_date
            FROM articles
            WHERE sent_date IS NULL
            ORDER BY collected_date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(row_to_stored(&row)?);
        }

        Ok(articles)
    }

    /// Delete rows collected strictly more than `retention_days` ago,
    /// sent or not; returns the number removed. A row aged exactly
    /// `retention_days` is kept.
    pub async fn cleanup_expired(&self) -> u64 {
        self.cleanup_expired_asof(Local::now().date_naive()).await
    }

    /// `cleanup_expired` evaluated against an explicit "today".
    pub async fn cleanup_expired_asof(&self, today: NaiveDate) -> u64 {
        match self.try_cleanup(today).await {
            Ok(removed) => {
                info!(removed, "expired articles removed");
                removed
            }
            Err(e) => {
                error!(error = %e, "retention cleanup failed");
                0
            }
        }
    }

    async fn try_cleanup(&self, today: NaiveDate) -> Result<u64> {
        let cutoff = today - Duration::days(self.retention_days);
        let done = sqlx::query("DELETE FROM articles WHERE collected_date < ?")
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Total number of persisted articles.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Fetch one stored article by URL, mainly for inspection and tests.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query(
            r#"
            SELECT title, url, abstract, authors, published_date,
                   journal, keywords, doi, source_id, collected_date, sent_date
            FROM articles
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_stored).transpose()
    }
}

fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<StoredArticle> {
    // Author and keyword lists are stored as JSON text columns.
    let authors: Vec<String> =
        serde_json::from_str(row.try_get::<String, _>("authors")?.as_str()).unwrap_or_default();
    let keywords: Vec<String> =
        serde_json::from_str(row.try_get::<String, _>("keywords")?.as_str()).unwrap_or_default();

    let collected_date = parse_stored_date(&row.try_get::<String, _>("collected_date")?)?;
    let sent_date = row
        .try_get::<Option<String>, _>("sent_date")?
        .map(|raw| parse_stored_date(&raw))
        .transpose()?;

    Ok(StoredArticle {
        article: Article {
            title: row.try_get("title")?,
            url: row.try_get("url")?,
            abstract_text: row.try_get("abstract")?,
            authors,
            published_date: row.try_get("published_date")?,
            journal: row.try_get("journal")?,
            keywords,
            doi: row.try_get("doi")?,
            source_id: row.try_get("source_id")?,
        },
        collected_date,
        sent_date,
    })
}

fn parse_stored_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(TrackerError::from)
}
