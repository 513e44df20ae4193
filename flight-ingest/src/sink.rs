use crate::batch::TransportBatch;
use crate::config::SinkConfig;
use crate::traits::StreamSink;
use crate::types::{IngestError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Mutex;
use tracing::debug;
use url::Url;

const BATCH_CONTENT_TYPE: &str = "application/vnd.microsoft.servicebus.json";

/// Sends batches to an Event Hubs REST endpoint.
pub struct EventHubSink {
    client: Client,
    messages_url: Url,
    sas_token: Option<String>,
    max_batch_bytes: usize,
}

impl EventHubSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        if config.max_batch_bytes == 0 {
            return Err(IngestError::Config(
                "max batch size must be positive".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            messages_url: config.messages_url()?,
            sas_token: config.sas_token.clone().filter(|t| !t.trim().is_empty()),
            max_batch_bytes: config.max_batch_bytes,
        })
    }
}

#[async_trait]
impl StreamSink for EventHubSink {
    fn sink_name(&self) -> String {
        self.messages_url.to_string()
    }

    fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    async fn send_batch(&self, batch: &TransportBatch) -> Result<()> {
        let body = batch.body();
        debug!(
            "Posting batch of {} events ({} bytes) to {}",
            batch.len(),
            body.len(),
            self.messages_url
        );

        let mut request = self
            .client
            .post(self.messages_url.clone())
            .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(body);
        if let Some(token) = &self.sas_token {
            request = request.header(AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Sink {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Keeps every batch in memory. Used for dry runs and tests.
#[derive(Debug)]
pub struct MemorySink {
    max_batch_bytes: usize,
    batches: Mutex<Vec<TransportBatch>>,
}

impl MemorySink {
    pub fn new(max_batch_bytes: usize) -> Self {
        Self {
            max_batch_bytes,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batches(&self) -> Vec<TransportBatch> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StreamSink for MemorySink {
    fn sink_name(&self) -> String {
        "memory".to_string()
    }

    fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    async fn send_batch(&self, batch: &TransportBatch) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| IngestError::General("memory sink lock poisoned".to_string()))?
            .push(batch.clone());
        Ok(())
    }
}
