use async_trait::async_trait;
use chrono::NaiveDate;
use paper_tracker::collectors::Collector;
use paper_tracker::{Article, ArticleStore, KeywordFilter, MatchingConfig, Pipeline};
use tempfile::tempdir;

/// A canned source: returns the same batch on every call, like a feed whose
/// upstream has not changed between runs.
struct StaticCollector {
    id: String,
    articles: Vec<Article>,
}

#[async_trait]
impl Collector for StaticCollector {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn source_name(&self) -> &str {
        &self.id
    }

    async fn collect(&self, _topics: &[String], limit: usize) -> Vec<Article> {
        self.articles.iter().take(limit).cloned().collect()
    }
}

fn article(url: &str, title: &str, published: Option<&str>) -> Article {
    Article {
        title: title.to_string(),
        url: url.to_string(),
        abstract_text: String::new(),
        authors: Vec::new(),
        published_date: published.map(str::to_string),
        journal: "Test Journal".to_string(),
        keywords: Vec::new(),
        doi: None,
        source_id: "static".to_string(),
    }
}

fn target_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

async fn build_pipeline(dir: &tempfile::TempDir, sources: Vec<Box<dyn Collector>>) -> Pipeline {
    let store = ArticleStore::open(&dir.path().join("articles.db"), 30)
        .await
        .unwrap();
    let filter = KeywordFilter::new(&["battery".to_string()], &MatchingConfig::default()).unwrap();
    Pipeline::new(sources, filter, store, vec!["battery".to_string()], 100)
}

#[tokio::test]
async fn run_filters_windows_and_dedups() {
    let dir = tempdir().unwrap();

    let source_a = StaticCollector {
        id: "feed-a".to_string(),
        articles: vec![
            // Matches keyword and target day.
            article("http://a/1", "A new Battery design", Some("2024-05-01T08:00:00Z")),
            // Matches keyword, tolerant date form, same day.
            article("http://a/2", "Battery cathodes", Some("May 1, 2024")),
            // Matches keyword but wrong day.
            article("http://a/3", "Battery anodes", Some("2024-04-30")),
            // Matches keyword but unresolvable date.
            article("http://a/4", "Battery electrolytes", Some("Spring 2024")),
            // Right day but no keyword match.
            article("http://a/5", "Wind turbines", Some("2024-05-01")),
        ],
    };
    let source_b = StaticCollector {
        id: "feed-b".to_string(),
        articles: vec![
            // Same URL as one emitted by source A: deduplicated by the store.
            article("http://a/1", "A new Battery design", Some("2024-05-01")),
            article("http://b/1", "Battery recycling", Some("2024-05-01")),
        ],
    };

    let pipeline =
        build_pipeline(&dir, vec![Box::new(source_a), Box::new(source_b)]).await;

    let fresh = pipeline.run(target_day()).await;
    let urls: Vec<&str> = fresh.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(urls, vec!["http://a/1", "http://a/2", "http://b/1"]);

    // The same upstream content on the next run yields nothing new.
    let again = pipeline.run(target_day()).await;
    assert!(again.is_empty());
    assert_eq!(pipeline.store().count().await.unwrap(), 3);
}

#[tokio::test]
async fn max_per_source_caps_each_batch() {
    let dir = tempdir().unwrap();

    let source = StaticCollector {
        id: "feed".to_string(),
        articles: (0..10)
            .map(|i| {
                article(
                    &format!("http://x/{}", i),
                    "Battery paper",
                    Some("2024-05-01"),
                )
            })
            .collect(),
    };

    let store = ArticleStore::open(&dir.path().join("articles.db"), 30)
        .await
        .unwrap();
    let filter = KeywordFilter::new(&["battery".to_string()], &MatchingConfig::default()).unwrap();
    let pipeline = Pipeline::new(
        vec![Box::new(source)],
        filter,
        store,
        vec!["battery".to_string()],
        3,
    );

    let fresh = pipeline.run(target_day()).await;
    assert_eq!(fresh.len(), 3);
}

#[tokio::test]
async fn empty_sources_produce_an_empty_run() {
    let dir = tempdir().unwrap();
    let pipeline = build_pipeline(&dir, Vec::new()).await;
    assert!(pipeline.run(target_day()).await.is_empty());
}
