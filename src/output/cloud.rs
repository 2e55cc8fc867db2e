//! Bucket access for the object-store and warehouse destinations
//! (GCS, S3, R2, Azure, or a local directory standing in for a bucket)

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A parquet object found under a bucket prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParquetObject {
    /// Key relative to the bucket root
    pub key: String,
    /// File name without the `.parquet` extension
    pub stem: String,
    pub size: usize,
}

/// An object written by [`CloudStore::put`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key relative to the bucket root
    pub key: String,
    /// Full location, e.g. `gs://bucket/citybike_data/networks_20240925.parquet`
    pub location: String,
    pub size: usize,
}

/// A bucket (plus optional key prefix) parsed from a URL
#[derive(Debug, Clone)]
pub struct CloudStore {
    store: Arc<dyn ObjectStore>,
    /// Bucket or container name; the directory for local stores
    root: String,
    /// Key prefix within the bucket/container
    prefix: String,
    /// URL scheme, for logging
    scheme: String,
}

impl CloudStore {
    /// Parse a bucket URL and create the matching object store
    ///
    /// Supported formats:
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self::from_store(Arc::new(store), bucket, prefix, "gs"))
        } else if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;
            Ok(Self::from_store(Arc::new(store), bucket, prefix, "s3"))
        } else if let Some(rest) = url.strip_prefix("r2://") {
            let (bucket, prefix) = split_bucket(rest);
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            // AWS_ENDPOINT is already read by from_env()
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
            let store = builder
                .build()
                .map_err(|e| Error::config(format!("Failed to create r2 client: {e}")))?;
            Ok(Self::from_store(Arc::new(store), bucket, prefix, "r2"))
        } else if let Some(rest) = url.strip_prefix("az://") {
            let (container, prefix) = split_bucket(rest);
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self::from_store(Arc::new(store), container, prefix, "az"))
        } else {
            Self::parse_local(url.strip_prefix("file://").unwrap_or(url))
        }
    }

    fn parse_local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let root = std::fs::canonicalize(path)
            .map_err(|e| Error::config(format!("Failed to resolve directory {path}: {e}")))?;
        let store = LocalFileSystem::new_with_prefix(&root)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        let root = root.to_string_lossy().into_owned();
        Ok(Self::from_store(Arc::new(store), &root, String::new(), "file"))
    }

    /// Wrap an existing store
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        root: &str,
        prefix: String,
        scheme: &str,
    ) -> Self {
        Self {
            store,
            root: root.trim_end_matches('/').to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            scheme: scheme.to_string(),
        }
    }

    /// Check if this is a cloud bucket (not local)
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file"
    }

    /// The scheme (gs, s3, r2, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn object_path(&self, key: &str) -> ObjectPath {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix))
        }
    }

    fn location(&self, path: &ObjectPath) -> String {
        format!("{}://{}/{path}", self.scheme, self.root)
    }

    /// Human-readable location of `key`, e.g. `gs://bucket/citybike_data/x.parquet`
    pub fn display_key(&self, key: &str) -> String {
        self.location(&self.object_path(key))
    }

    /// Write bytes at `key`, replacing any existing object
    pub async fn put(&self, key: &str, data: Bytes) -> Result<StoredObject> {
        let path = self.object_path(key);
        let size = data.len();
        self.store.put(&path, data.into()).await?;
        Ok(StoredObject {
            key: path.to_string(),
            location: self.location(&path),
            size,
        })
    }

    /// Upload a local file verbatim to `key`
    pub async fn upload_file(&self, local: &Path, key: &str) -> Result<StoredObject> {
        let data = tokio::fs::read(local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: local.display().to_string(),
            },
            _ => Error::Io(e),
        })?;
        debug!("Uploading {} ({} bytes)", local.display(), data.len());
        self.put(key, Bytes::from(data)).await
    }

    /// Read the object at a bucket-relative key
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = ObjectPath::from(key);
        let bytes = self.store.get(&path).await?.bytes().await?;
        Ok(bytes)
    }

    /// List the `.parquet` objects under `prefix`, sorted by key
    pub async fn list_parquet(&self, prefix: &str) -> Result<Vec<ParquetObject>> {
        let location = self.object_path(prefix.trim_end_matches('/'));
        let location = (!location.as_ref().is_empty()).then_some(location);

        let metas: Vec<_> = self.store.list(location.as_ref()).try_collect().await?;
        let mut objects: Vec<ParquetObject> = metas
            .into_iter()
            .filter(|meta| meta.location.extension() == Some("parquet"))
            .filter_map(|meta| {
                let stem = meta.location.filename()?.strip_suffix(".parquet")?.to_string();
                Some(ParquetObject {
                    key: meta.location.to_string(),
                    stem,
                    size: meta.size,
                })
            })
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

/// Split `bucket/some/prefix` into `("bucket", "some/prefix")`
fn split_bucket(without_scheme: &str) -> (&str, String) {
    match without_scheme.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.to_string()),
        None => (without_scheme, String::new()),
    }
}
