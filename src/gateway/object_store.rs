// dashboardtool/src/gateway/object_store.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;

use crate::config::{AwsConfig, ObjectStoreConfig};
use crate::errors::{AppError, Result};

/// Object store used to publish operation results.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

pub struct S3ObjectStore {
    client: s3::Client,
}

impl S3ObjectStore {
    /// Builds an S3 client from the AWS profile chain, optionally pointed at an
    /// S3-compatible endpoint (e.g. DigitalOcean Spaces, MinIO).
    pub async fn connect(aws_config: &AwsConfig, store_config: Option<&ObjectStoreConfig>) -> Self {
        let sdk_config = aws_config.load_sdk_config().await;
        let mut builder = s3::config::Builder::from(&sdk_config);
        if let Some(store) = store_config {
            if let Some(endpoint) = &store.endpoint_url {
                builder = builder.endpoint_url(endpoint);
            }
            if let Some(region) = &store.region {
                builder = builder.region(s3::config::Region::new(region.clone()));
            }
            builder = builder.force_path_style(store.force_path_style);
        }
        Self {
            client: s3::Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        tracing::info!("Uploading result to S3 bucket {} with key {}", bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "Failed to upload result to S3 bucket {} with key {}: {}",
                    bucket,
                    key,
                    s3::error::DisplayErrorContext(&e)
                ))
            })?;

        tracing::info!("✅ Uploaded result to s3://{}/{}", bucket, key);
        Ok(())
    }
}
