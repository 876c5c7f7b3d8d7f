use chrono::NaiveDate;
use paper_tracker::{Article, ArticleStore};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn article(url: &str) -> Article {
    Article {
        title: format!("Article at {}", url),
        url: url.to_string(),
        abstract_text: "An abstract.".to_string(),
        authors: vec!["A. Author".to_string(), "B. Author".to_string()],
        published_date: Some("2024-05-01".to_string()),
        journal: "Test Journal".to_string(),
        keywords: vec!["battery".to_string()],
        doi: Some("10.1000/test".to_string()),
        source_id: "test".to_string(),
    }
}

async fn open_store(dir: &tempfile::TempDir, retention_days: i64) -> ArticleStore {
    ArticleStore::open(&dir.path().join("articles.db"), retention_days)
        .await
        .unwrap()
}

#[tokio::test]
async fn save_new_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    let batch = vec![article("http://a"), article("http://b")];

    let first = store.save_new(&batch).await;
    assert_eq!(first.len(), 2);

    let second = store.save_new(&batch).await;
    assert!(second.is_empty());

    // The row count does not grow on the second call.
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn first_seen_fields_win() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    let mut original = article("http://a");
    original.title = "Original title".to_string();
    store.save_new(&[original]).await;

    let mut conflicting = article("http://a");
    conflicting.title = "Rewritten title".to_string();
    conflicting.journal = "Other Journal".to_string();
    let fresh = store.save_new(&[conflicting]).await;
    assert!(fresh.is_empty());

    let stored = store.get_by_url("http://a").await.unwrap().unwrap();
    assert_eq!(stored.article.title, "Original title");
    assert_eq!(stored.article.journal, "Test Journal");
}

#[tokio::test]
async fn duplicate_urls_within_one_batch_collapse() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    let fresh = store
        .save_new(&[article("http://a"), article("http://a")])
        .await;
    assert_eq!(fresh.len(), 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn lists_are_restored_in_order() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    store.save_new(&[article("http://a")]).await;
    let stored = store.get_by_url("http://a").await.unwrap().unwrap();
    assert_eq!(stored.article.authors, vec!["A. Author", "B. Author"]);
    assert_eq!(stored.article.keywords, vec!["battery"]);
}

#[tokio::test]
async fn cleanup_removes_strictly_older_rows_only() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;
    let today = date(2024, 6, 1);

    // One row just past the window, one exactly on the boundary, one recent.
    store
        .save_new_dated(&[article("http://expired")], today - chrono::Duration::days(31))
        .await;
    store
        .save_new_dated(&[article("http://boundary")], today - chrono::Duration::days(30))
        .await;
    store.save_new_dated(&[article("http://recent")], today).await;

    let removed = store.cleanup_expired_asof(today).await;
    assert_eq!(removed, 1);

    assert!(store.get_by_url("http://expired").await.unwrap().is_none());
    // A row aged exactly retention_days survives.
    assert!(store.get_by_url("http://boundary").await.unwrap().is_some());
    assert!(store.get_by_url("http://recent").await.unwrap().is_some());
}

#[tokio::test]
async fn cleanup_is_unconditional_for_sent_rows() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 7).await;
    let today = date(2024, 6, 1);

    store
        .save_new_dated(&[article("http://old-sent")], today - chrono::Duration::days(8))
        .await;
    store
        .mark_sent_dated(&["http://old-sent".to_string()], today - chrono::Duration::days(8))
        .await;

    let removed = store.cleanup_expired_asof(today).await;
    assert_eq!(removed, 1);
    assert!(store.get_by_url("http://old-sent").await.unwrap().is_none());
}

#[tokio::test]
async fn mark_sent_keeps_the_first_date() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    store.save_new(&[article("http://a")]).await;

    let urls = vec!["http://a".to_string()];
    store.mark_sent_dated(&urls, date(2024, 5, 1)).await;
    store.mark_sent_dated(&urls, date(2024, 5, 9)).await;

    let stored = store.get_by_url("http://a").await.unwrap().unwrap();
    assert_eq!(stored.sent_date, Some(date(2024, 5, 1)));
}

#[tokio::test]
async fn mark_sent_ignores_unknown_urls() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    // No rows exist; marking must be a silent no-op.
    store
        .mark_sent_dated(&["http://missing".to_string()], date(2024, 5, 1))
        .await;
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn list_unsent_orders_and_caps() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    store
        .save_new_dated(&[article("http://old")], date(2024, 5, 1))
        .await;
    store
        .save_new_dated(&[article("http://mid-1"), article("http://mid-2")], date(2024, 5, 2))
        .await;
    store
        .save_new_dated(&[article("http://new")], date(2024, 5, 3))
        .await;
    store
        .mark_sent_dated(&["http://mid-1".to_string()], date(2024, 5, 2))
        .await;

    let unsent = store.list_unsent(10).await;
    let urls: Vec<&str> = unsent.iter().map(|s| s.article.url.as_str()).collect();
    // Most recently collected first, identity descending within one day,
    // sent rows excluded.
    assert_eq!(urls, vec!["http://new", "http://mid-2", "http://old"]);

    let capped = store.list_unsent(2).await;
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].article.url, "http://new");
}

#[tokio::test]
async fn collected_date_is_assigned_at_first_persistence() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir, 30).await;

    store
        .save_new_dated(&[article("http://a")], date(2024, 5, 1))
        .await;
    // A later save of the same URL must not move the collection date.
    store
        .save_new_dated(&[article("http://a")], date(2024, 5, 9))
        .await;

    let stored = store.get_by_url("http://a").await.unwrap().unwrap();
    assert_eq!(stored.collected_date, date(2024, 5, 1));
    assert_eq!(stored.sent_date, None);
}
