use crate::batch::TransportBatch;
use crate::types::{FetchOutcome, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Source of live snapshots (the polling API).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Issue one bounded request. Failures are reported in the outcome,
    /// never raised.
    async fn fetch(&self) -> FetchOutcome;
}

/// Streaming ingestion endpoint that accepts size-bounded batches.
#[async_trait]
pub trait StreamSink: Send + Sync {
    fn sink_name(&self) -> String;

    /// Largest encoded batch body the sink accepts.
    fn max_batch_bytes(&self) -> usize;

    /// Transmit one sealed batch atomically.
    async fn send_batch(&self, batch: &TransportBatch) -> Result<()>;
}

/// Listing metadata for one persisted object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Storage backend holding the persisted batch files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Objects whose names start with `prefix`.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<BlobMeta>>;

    /// Full content of one object.
    async fn fetch_object(&self, name: &str) -> Result<Bytes>;
}
