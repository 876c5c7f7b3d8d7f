use crate::types::Result;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Requests per second allowed against this source; zero disables
    /// throttling.
    pub rate_limit: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "paper-tracker/0.1".to_string(),
            timeout_seconds: 30,
            rate_limit: 1.0,
        }
    }
}

impl FetchConfig {
    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// HTTP client wrapper owned by a single source adapter.
///
/// Enforces a minimum inter-request interval derived from the source's
/// requests-per-second ceiling, independently of every other source.
pub struct Fetcher {
    client: Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        let min_interval = if config.rate_limit > 0.0 {
            Duration::from_secs_f64(1.0 / config.rate_limit)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            client,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// GET the given URL and return the response body as text.
    ///
    /// `query` pairs are appended to the URL; `headers` are sent verbatim.
    /// Non-2xx statuses are reported as errors.
    pub async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &BTreeMap<String, String>,
    ) -> Result<String> {
        self.throttle().await;

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Wait until the minimum inter-request interval has elapsed.
    async fn throttle(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(?wait, "rate limiting request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
