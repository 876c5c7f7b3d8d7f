use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use paper_tracker::{ArticleStore, Config, EmailNotifier, Pipeline};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "paper-tracker",
    about = "Collect, filter, and track newly published research articles."
)]
struct Cli {
    /// Directory containing config.yaml, journals.yaml, and keywords.yaml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Collect and store articles without sending the email notification
    #[arg(long)]
    no_email: bool,

    /// Which calendar day to keep articles from
    #[arg(long, value_enum, default_value = "today")]
    target_day: TargetDay,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetDay {
    Today,
    Yesterday,
}

impl TargetDay {
    fn resolve(self) -> NaiveDate {
        let today = Local::now().date_naive();
        match self {
            TargetDay::Today => today,
            TargetDay::Yesterday => today - Duration::days(1),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config_dir)?;

    let db_path = PathBuf::from(&config.app.storage.database_path);
    let store = ArticleStore::open(&db_path, config.app.storage.retention_days).await?;

    let pipeline = Pipeline::from_config(&config, store)?;
    let new_articles = pipeline.run(cli.target_day.resolve()).await;

    if cli.no_email {
        info!("email notification disabled");
        return Ok(());
    }
    if new_articles.is_empty() {
        info!("no new articles to send");
        return Ok(());
    }

    let batch: Vec<_> = new_articles
        .into_iter()
        .take(config.app.run.max_articles_per_email)
        .collect();

    let notifier = EmailNotifier::new(config.app.email.clone());
    match notifier.send_articles(&batch).await {
        Ok(()) => {
            let urls: Vec<String> = batch.iter().map(|article| article.url.clone()).collect();
            pipeline.store().mark_sent(&urls).await;
            info!(count = batch.len(), "articles sent and marked");
        }
        Err(e) => {
            // Leave the articles unsent; the next run can pick them up.
            error!(error = %e, "sending notification email failed");
        }
    }

    Ok(())
}
