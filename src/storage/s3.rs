//! S3-compatible remote tier (AWS S3, Cloudflare R2, Backblaze B2, MinIO).
//!
//! The SDK is async; the pipeline is not. [`S3Store`] owns a current-thread
//! Tokio runtime and blocks on each request.

use super::{RemoteStore, StorageError};
use crate::config::RemoteSettings;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
};
use std::path::Path;

/// Remote store backed by an S3 bucket, optionally under a key prefix.
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
    runtime: tokio::runtime::Runtime,
}

fn remote_error(e: impl std::error::Error) -> StorageError {
    StorageError::Remote(DisplayErrorContext(e).to_string())
}

impl S3Store {
    pub fn connect(settings: &RemoteSettings) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "darkroom-config",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            // Path-style addressing works with every S3-compatible service.
            .force_path_style(true);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
            prefix: settings.prefix.clone(),
            runtime,
        })
    }

    fn full_key(&self, key: &str) -> String {
        full_key(&self.prefix, key)
    }
}

fn full_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

impl RemoteStore for S3Store {
    fn put_file(&self, source: &Path, key: &str) -> Result<(), StorageError> {
        let key = self.full_key(key);
        self.runtime.block_on(async {
            let body = ByteStream::from_path(source).await.map_err(remote_error)?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(body)
                .send()
                .await
                .map_err(remote_error)?;
            Ok::<_, StorageError>(())
        })
    }

    fn get_to_file(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        let key = self.full_key(key);
        let bytes = self.runtime.block_on(async {
            let object = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(remote_error)?;
            let data = object.body.collect().await.map_err(remote_error)?;
            Ok::<_, StorageError>(data.into_bytes())
        })?;
        std::fs::write(dest, &bytes)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = self.full_key(key);
        self.runtime.block_on(async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(remote_error)?;
            Ok::<_, StorageError>(())
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let key = self.full_key(key);
        self.runtime.block_on(async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(SdkError::ServiceError(e)) if e.err().is_not_found() => Ok(false),
                Err(e) => Err(remote_error(e)),
            }
        })
    }
}
