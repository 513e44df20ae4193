pub mod types;
pub mod config;
pub mod state_vector;
pub mod parser;
pub mod traits;
pub mod batch;
pub mod fetcher;
pub mod sink;
pub mod sender;
pub mod pipeline;
pub mod signal;
pub mod storage;
pub mod loader;
pub mod aggregator;

pub use types::*;
pub use config::{FetchConfig, LoadOptions, PollConfig, SinkConfig, StorageConfig};
pub use batch::TransportBatch;
pub use fetcher::SnapshotFetcher;
pub use sink::{EventHubSink, MemorySink};
pub use sender::BatchSender;
pub use pipeline::{CycleOutcome, PollLoop};
pub use storage::ObjectStoreBackend;
pub use loader::BlobRecordLoader;
pub use aggregator::RecordAggregator;
pub use traits::{BlobMeta, BlobStore, SnapshotSource, StreamSink};
