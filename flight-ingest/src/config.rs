use crate::types::{IngestError, Result};
use clap::Args;
use std::time::Duration;
use url::Url;

pub const DEFAULT_POLL_ENDPOINT: &str = "https://opensky-network.org/api/states/all";

/// Largest batch body Event Hubs accepts on a standard namespace.
pub const EVENT_HUB_MAX_BATCH_BYTES: usize = 1_046_528;

#[derive(Debug, Clone, Args)]
pub struct FetchConfig {
    /// Polling endpoint returning `{"states": [...]}`
    #[arg(long = "endpoint", env = "OPENSKY_URL", default_value = DEFAULT_POLL_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, env = "FETCH_USER_AGENT", default_value = "flight-ingest/0.1")]
    pub user_agent: String,

    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// Extra attempts after the first request fails; 0 issues a single request
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 1)]
    pub retry_delay_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_POLL_ENDPOINT.to_string(),
            user_agent: "flight-ingest/0.1".to_string(),
            timeout_seconds: 10,
            max_retries: 0,
            retry_delay_seconds: 1,
        }
    }
}

impl FetchConfig {
    pub fn endpoint_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.endpoint)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SinkConfig {
    /// Event Hubs namespace, e.g. https://my-ns.servicebus.windows.net
    #[arg(id = "sink_endpoint", long = "sink-endpoint", env = "EVENT_HUB_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long = "event-hub-name", env = "EVENTHUB_NAME")]
    pub hub_name: Option<String>,

    /// Pre-issued `SharedAccessSignature ...` token
    #[arg(long = "sas-token", env = "EVENT_HUB_SAS_TOKEN", hide_env_values = true)]
    pub sas_token: Option<String>,

    #[arg(long, default_value_t = EVENT_HUB_MAX_BATCH_BYTES)]
    pub max_batch_bytes: usize,

    #[arg(long, default_value_t = 30)]
    pub sink_timeout_seconds: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            hub_name: None,
            sas_token: None,
            max_batch_bytes: EVENT_HUB_MAX_BATCH_BYTES,
            sink_timeout_seconds: 30,
        }
    }
}

impl SinkConfig {
    /// `{namespace}/{hub}/messages`. Connection-string style `sb://` hosts
    /// are rewritten to `https://`.
    pub fn messages_url(&self) -> Result<Url> {
        let endpoint = non_empty(self.endpoint.as_deref())
            .ok_or_else(|| IngestError::Config("sink endpoint is not set".to_string()))?;
        let hub = non_empty(self.hub_name.as_deref())
            .ok_or_else(|| IngestError::Config("event hub name is not set".to_string()))?;

        let endpoint = match endpoint.strip_prefix("sb://") {
            Some(rest) => format!("https://{}", rest),
            None => endpoint.to_string(),
        };

        let url = Url::parse(&format!(
            "{}/{}/messages",
            endpoint.trim_end_matches('/'),
            hub.trim_matches('/')
        ))?;
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_seconds)
    }
}

#[derive(Debug, Clone, Args)]
pub struct StorageConfig {
    #[arg(long = "blob-account", env = "BLOB_ACCOUNT")]
    pub account: Option<String>,

    #[arg(long = "blob-key", env = "BLOB_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    #[arg(long = "blob-container", env = "BLOB_CONTAINER")]
    pub container: Option<String>,

    /// Only objects whose names start with this prefix are read
    #[arg(long, default_value = "output/")]
    pub prefix: String,

    #[arg(long, default_value = ".json")]
    pub suffix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account: None,
            access_key: None,
            container: None,
            prefix: "output/".to_string(),
            suffix: ".json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub account: String,
    pub access_key: String,
}

impl StorageConfig {
    /// Credentials count as present only when both account and key are set.
    pub fn credentials(&self) -> Option<StorageCredentials> {
        let account = non_empty(self.account.as_deref())?;
        let access_key = non_empty(self.access_key.as_deref())?;
        Some(StorageCredentials {
            account: account.to_string(),
            access_key: access_key.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Args)]
pub struct LoadOptions {
    /// Newest objects to read
    #[arg(long, default_value_t = 5)]
    pub max_files: usize,

    /// Lines read per object, and records returned overall
    #[arg(long, default_value_t = 50)]
    pub max_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_rows: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PollConfig {
    #[arg(long, default_value_t = 10)]
    pub interval_seconds: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_seconds: 10 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
