//! Storage backends for persisted batch files.

use crate::config::{StorageConfig, StorageCredentials};
use crate::traits::{BlobMeta, BlobStore};
use crate::types::{IngestError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use std::sync::Arc;
use tracing::debug;

/// [`BlobStore`] over any `object_store` backend.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    canonical_url: String,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectStoreBackend<{}>", self.canonical_url)
    }
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>, canonical_url: impl Into<String>) -> Self {
        Self {
            store,
            canonical_url: canonical_url.into(),
        }
    }

    /// Azure Blob Storage container addressed with an account key.
    pub fn azure(config: &StorageConfig, credentials: &StorageCredentials) -> Result<Self> {
        let container = config
            .container
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| IngestError::Config("blob container is not set".to_string()))?;

        let store = MicrosoftAzureBuilder::new()
            .with_account(&credentials.account)
            .with_access_key(&credentials.access_key)
            .with_container_name(container)
            .with_retry(RetryConfig::default())
            .build()?;

        let canonical_url = format!(
            "https://{}.blob.core.windows.net/{}",
            credentials.account, container
        );
        Ok(Self::new(Arc::new(store), canonical_url))
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

/// The directory part of a raw name prefix, used to narrow the listing.
/// `output/2024` lists under `output` and is filtered by name afterwards.
fn listing_root(prefix: &str) -> Option<Path> {
    let dir = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    let dir = dir.trim_matches('/');
    (!dir.is_empty()).then(|| Path::from(dir))
}

#[async_trait]
impl BlobStore for ObjectStoreBackend {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<BlobMeta>> {
        let root = listing_root(prefix);
        debug!("Listing {} under {:?}", self.canonical_url, root);

        let objects: Vec<_> = self.store.list(root.as_ref()).try_collect().await?;
        Ok(objects
            .into_iter()
            .map(|meta| BlobMeta {
                name: meta.location.to_string(),
                last_modified: meta.last_modified,
                size: meta.size as u64,
            })
            .filter(|meta| meta.name.starts_with(prefix))
            .collect())
    }

    async fn fetch_object(&self, name: &str) -> Result<Bytes> {
        let path = Path::from(name);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    #[test]
    fn listing_root_uses_directory_part() {
        assert_eq!(listing_root("output/"), Some(Path::from("output")));
        assert_eq!(listing_root("output/2024"), Some(Path::from("output")));
        assert_eq!(listing_root("a/b/c"), Some(Path::from("a/b")));
        assert_eq!(listing_root("output"), None);
        assert_eq!(listing_root(""), None);
    }

    #[tokio::test]
    async fn lists_by_raw_name_prefix() {
        let store = Arc::new(InMemory::new());
        for name in ["output/a.json", "output/b.txt", "outputs/c.json", "other/d.json"] {
            store
                .put(&Path::from(name), PutPayload::from("x"))
                .await
                .unwrap();
        }
        let backend = ObjectStoreBackend::new(store, "memory://");

        let mut names: Vec<_> = backend
            .list_objects("output/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        names.sort();

        assert_eq!(names, vec!["output/a.json", "output/b.txt"]);
    }

    #[tokio::test]
    async fn missing_object_is_an_error() {
        let backend = ObjectStoreBackend::new(Arc::new(InMemory::new()), "memory://");
        assert!(matches!(
            backend.fetch_object("output/none.json").await,
            Err(IngestError::Storage(_))
        ));
    }
}
