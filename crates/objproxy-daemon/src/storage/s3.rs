//! S3-compatible backend built on aws-sdk-s3.
//!
//! Credentials come from the standard AWS provider chain (environment,
//! profile, instance metadata). Object bodies are streamed, never buffered.

use super::{ObjectReader, StorageError, StorageReader, StorageResult};
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use objproxy_config::StorageConfig;
use tracing::debug;

pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::Backend("storage.bucket is not set".into()))?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Path-style addressing keeps MinIO and other self-hosted stores working.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        debug!(bucket = %bucket, prefix = %config.prefix, "S3 storage configured");
        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket,
            prefix: config.prefix.clone(),
        })
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

#[async_trait]
impl StorageReader for S3Storage {
    async fn open_object(&self, name: &str) -> StorageResult<ObjectReader> {
        let key = self.key_for(name);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match resp {
            Ok(output) => Ok(Box::new(Box::pin(output.body.into_async_read()))),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Err(StorageError::NotFound(name.to_string()))
                } else {
                    Err(StorageError::Backend(format!(
                        "get_object {}/{}: {}",
                        self.bucket, key, service_err
                    )))
                }
            }
        }
    }
}
