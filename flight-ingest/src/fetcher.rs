use crate::config::FetchConfig;
use crate::traits::SnapshotSource;
use crate::types::{FetchOutcome, IngestError, Result, Snapshot};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Polls the live state-vector endpoint.
pub struct SnapshotFetcher {
    client: Client,
    endpoint: Url,
    config: FetchConfig,
}

impl SnapshotFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// One request, no retries. Non-2xx and transport errors are returned
    /// as `TransientFetch`.
    pub async fn fetch_once(&self) -> Result<Snapshot> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| IngestError::TransientFetch {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::TransientFetch {
                reason: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let snapshot = response
            .json::<Snapshot>()
            .await
            .map_err(|e| IngestError::TransientFetch {
                reason: format!("invalid snapshot body: {}", e),
            })?;
        Ok(snapshot)
    }

    fn retry_policy(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let delay = Duration::from_secs(self.config.retry_delay_seconds);
        ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(delay * 60),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SnapshotSource for SnapshotFetcher {
    fn source_name(&self) -> String {
        self.endpoint
            .host_str()
            .map(|host| format!("polling API ({})", host))
            .unwrap_or_else(|| "polling API".to_string())
    }

    async fn fetch(&self) -> FetchOutcome {
        let start_time = Instant::now();
        let mut backoff = self.retry_policy();
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_once().await {
                Ok(snapshot) => {
                    let count = snapshot.states.as_ref().map_or(0, Vec::len);
                    info!(
                        "Fetched snapshot with {} states from {} in {}ms",
                        count,
                        self.endpoint,
                        start_time.elapsed().as_millis()
                    );
                    return FetchOutcome::Snapshot(snapshot);
                }
                Err(e) => {
                    debug!("Fetch attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);

                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {}, retrying in {:?}",
                                attempt + 1,
                                self.endpoint,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch snapshot from {}: {}", self.endpoint, reason);
        FetchOutcome::Failed(reason)
    }
}
