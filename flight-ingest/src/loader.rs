use crate::config::{LoadOptions, StorageConfig};
use crate::parser;
use crate::storage::ObjectStoreBackend;
use crate::traits::{BlobMeta, BlobStore};
use crate::types::{FieldPresence, FlightRecord, IngestError, Result};
use interfaces::FlightDataSource;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Record returned when no storage credentials are configured, so the
/// rest of the system can run locally without network access.
pub fn placeholder_record() -> FlightRecord {
    FlightRecord {
        icao24: "4caa54".to_string(),
        callsign: "EAI57KF".to_string(),
        origin_country: "Ireland".to_string(),
        timestamp: 1756046666,
        longitude: -3.3631,
        latitude: 55.9513,
        altitude: 0.0,
        velocity: 8.23,
        presence: FieldPresence::all(),
    }
}

enum Backend {
    /// No credentials configured.
    Placeholder,
    Store(Arc<dyn BlobStore>),
    /// Credentials were given but the backend could not be set up.
    Unavailable(String),
}

/// Reads the newest persisted batch files and decodes their records.
///
/// Every call is independent; the loader holds no mutable state, so it can
/// be shared between concurrent callers.
pub struct BlobRecordLoader {
    backend: Backend,
    prefix: String,
    suffix: String,
}

impl BlobRecordLoader {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            backend: Backend::Store(store),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// A loader that always yields [`placeholder_record`].
    pub fn without_credentials() -> Self {
        let defaults = StorageConfig::default();
        Self {
            backend: Backend::Placeholder,
            prefix: defaults.prefix,
            suffix: defaults.suffix,
        }
    }

    /// Azure-backed loader when credentials are present, placeholder mode
    /// otherwise. A misconfigured backend degrades to empty results.
    pub fn from_config(config: &StorageConfig) -> Self {
        let backend = match config.credentials() {
            None => {
                warn!("Storage credentials missing, loader will return placeholder data");
                Backend::Placeholder
            }
            Some(credentials) => match ObjectStoreBackend::azure(config, &credentials) {
                Ok(store) => {
                    info!("Reading persisted batches from {}", store.canonical_url());
                    Backend::Store(Arc::new(store))
                }
                Err(e) => {
                    error!("Storage backend could not be configured: {}", e);
                    Backend::Unavailable(e.to_string())
                }
            },
        };

        Self {
            backend,
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.backend, Backend::Placeholder)
    }

    pub async fn load_with(&self, options: LoadOptions) -> Vec<FlightRecord> {
        self.load(options.max_files, options.max_rows).await
    }

    /// At most `max_rows` records from the newest `max_files` objects.
    ///
    /// An empty result means either that nothing is stored or that the
    /// backend could not be listed; the two are not distinguished here.
    pub async fn load(&self, max_files: usize, max_rows: usize) -> Vec<FlightRecord> {
        info!("Loading records (max_files={}, max_rows={})", max_files, max_rows);

        let store = match &self.backend {
            Backend::Placeholder => {
                warn!("No storage credentials, returning placeholder record");
                return vec![placeholder_record()];
            }
            Backend::Unavailable(reason) => {
                error!("Storage backend unavailable: {}", reason);
                return Vec::new();
            }
            Backend::Store(store) => store,
        };

        match self.load_from(store.as_ref(), max_files, max_rows).await {
            Ok(records) => records,
            Err(e) => {
                error!("Loading records failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn load_from(
        &self,
        store: &dyn BlobStore,
        max_files: usize,
        max_rows: usize,
    ) -> Result<Vec<FlightRecord>> {
        let objects = store
            .list_objects(&self.prefix)
            .await
            .map_err(|e| IngestError::BackendUnavailable(e.to_string()))?;

        let selected = self.newest_objects(objects, max_files);
        if selected.is_empty() {
            warn!("No {} objects under {}", self.suffix, self.prefix);
            return Ok(Vec::new());
        }
        info!("Processing {} objects", selected.len());

        let mut records = Vec::new();
        for (idx, object) in selected.iter().enumerate() {
            debug!("{}/{} - reading {}", idx + 1, selected.len(), object.name);
            match self.read_object(store, object, max_rows).await {
                Ok(mut object_records) => records.append(&mut object_records),
                Err(e) => error!("{}", e),
            }
        }

        info!("Decoded {} records in total", records.len());
        records.truncate(max_rows);
        Ok(records)
    }

    fn newest_objects(&self, objects: Vec<BlobMeta>, max_files: usize) -> Vec<BlobMeta> {
        let mut candidates: Vec<_> = objects
            .into_iter()
            .filter(|o| o.name.ends_with(&self.suffix))
            .collect();
        // Stable sort keeps listing order among equal timestamps.
        candidates.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        candidates.truncate(max_files);
        candidates
    }

    async fn read_object(
        &self,
        store: &dyn BlobStore,
        object: &BlobMeta,
        max_rows: usize,
    ) -> Result<Vec<FlightRecord>> {
        let access_error = |reason: String| IngestError::ObjectAccess {
            name: object.name.clone(),
            reason,
        };

        let bytes = store
            .fetch_object(&object.name)
            .await
            .map_err(|e| access_error(e.to_string()))?;
        let text = std::str::from_utf8(&bytes).map_err(|e| access_error(e.to_string()))?;

        let parsed = parser::parse_object_lines(&object.name, text, max_rows);
        info!(
            "{}: {} records from {} lines ({} skipped)",
            object.name,
            parsed.records.len(),
            parsed.lines_read,
            parsed.lines_skipped
        );
        Ok(parsed.records)
    }
}

impl FlightDataSource for BlobRecordLoader {
    fn load(
        &self,
        max_files: usize,
        max_rows: usize,
    ) -> impl std::future::Future<Output = Vec<FlightRecord>> + Send {
        BlobRecordLoader::load(self, max_files, max_rows)
    }
}
