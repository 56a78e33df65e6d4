//! S3 object storage for evidence photos and generated report PDFs.
//!
//! Each bucket is wrapped in its own `Storage`; services talk to `dyn ObjectStore`
//! so the flows can run against any bucket implementation.
//! Supports both AWS S3 and MinIO for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Bucket-scoped object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object, replacing any existing object under `key`.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()>;

    /// Download an object's bytes. A missing key is `NotFound`.
    async fn get(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Remove an object. Removing a missing object is not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Public URL scheme of this bucket.
    fn urls(&self) -> &PublicUrls;
}

/// Maps object keys to public URLs and back for one bucket.
///
/// URLs take the form `{base}/{bucket}/{key}`. The reverse mapping only accepts
/// URLs that carry exactly that prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrls {
    prefix: String,
}

impl PublicUrls {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            prefix: format!("{}/{}/", base_url.trim_end_matches('/'), bucket),
        }
    }

    /// Public URL for an object key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.trim_start_matches('/'))
    }

    /// Object key for a public URL of this bucket.
    ///
    /// Returns `None` for URLs of another host or bucket, URLs with a query or
    /// fragment, and keys that are empty or try to climb out of the bucket.
    pub fn key_for(&self, url: &str) -> Option<String> {
        let key = url.strip_prefix(&self.prefix)?;

        if key.is_empty()
            || key.contains(['?', '#'])
            || key.starts_with('/')
            || key.split('/').any(|segment| segment == "..")
        {
            return None;
        }

        Some(key.to_string())
    }
}

/// Both buckets used by the update flow.
#[derive(Clone)]
pub struct StorageBuckets {
    pub photos: Arc<dyn ObjectStore>,
    pub reports: Arc<dyn ObjectStore>,
}

/// S3 storage client wrapper for a single bucket.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    urls: PublicUrls,
}

impl Storage {
    /// Create the photo and report bucket clients from configuration.
    pub async fn connect(config: &StorageSettings) -> AppResult<StorageBuckets> {
        let client = Self::client(config);

        let photos = Self::for_bucket(client.clone(), config, &config.photo_bucket).await?;
        let reports = Self::for_bucket(client, config, &config.report_bucket).await?;

        Ok(StorageBuckets {
            photos: Arc::new(photos),
            reports: Arc::new(reports),
        })
    }

    fn client(config: &StorageSettings) -> Client {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "field-updates",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        Client::from_conf(s3_config_builder.build())
    }

    async fn for_bucket(client: Client, config: &StorageSettings, bucket: &str) -> AppResult<Self> {
        let storage = Self {
            client,
            bucket: bucket.to_string(),
            urls: PublicUrls::new(&config.public_url, bucket),
        };

        storage.ensure_bucket_exists().await?;
        info!("S3 storage initialized: bucket={}", bucket);

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Get the content type for an uploaded file based on its extension.
    pub fn content_type_for_extension(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "svg" => "image/svg+xml",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl ObjectStore for Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {} to S3: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("Object {}", key))
                } else {
                    AppError::Storage(format!("Failed to get {} from S3: {}", key, service_error))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {} from S3: {}", key, e)))?;

        Ok(())
    }

    fn urls(&self) -> &PublicUrls {
        &self.urls
    }
}
