//! S3 object store.
//!
//! Credentials come from the standard AWS provider chain (environment,
//! profile files, instance metadata). `AWS_ENDPOINT_URL` is honoured by the
//! loader, and `StorageConfig::endpoint_url` overrides it for MinIO-style
//! deployments.

use std::path::Path;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use swa_core::storage::ObjectStore;
use swa_types::config::StorageConfig;
use swa_types::error::StorageError;

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        tracing::debug!(endpoint = ?config.endpoint_url, region = ?config.region, "configured S3 client");
        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path).await.map_err(|e| StorageError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
            })?;
        tracing::debug!(bucket, key, "uploaded object");
        Ok(())
    }
}
