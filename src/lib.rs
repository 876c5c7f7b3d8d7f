pub mod collectors;
pub mod config;
pub mod dates;
pub mod fetcher;
pub mod filter;
pub mod notifier;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::Config;
pub use fetcher::{FetchConfig, Fetcher};
pub use filter::{KeywordFilter, MatchType, MatchingConfig};
pub use notifier::EmailNotifier;
pub use pipeline::Pipeline;
pub use storage::ArticleStore;
pub use types::{Article, Result, StoredArticle, TrackerError};
