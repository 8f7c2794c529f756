use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::{S3Config, StorageMetrics};
use crate::storage::{
    DeleteFailure, ObjectBody, ObjectEntry, ObjectMeta, ObjectReader, StorageBackend,
    StorageError,
};

/// S3 caps DeleteObjects at 1000 keys per request
const DELETE_BATCH_LIMIT: usize = 1000;

/// Storage backend over one S3 bucket
pub struct S3Backend {
    client: Client,
    config: S3Config,
    metrics: Arc<StorageMetrics>,
}

impl S3Backend {
    /// Create a backend using the default AWS credential chain
    pub async fn new(config: S3Config) -> Self {
        let client = super::create_s3_client(&config).await;
        Self::from_client(client, config)
    }

    /// Create a backend from an already configured SDK client
    pub fn from_client(client: Client, config: S3Config) -> Self {
        S3Backend {
            client,
            config,
            metrics: StorageMetrics::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    /// Create the shared bucket if it does not exist yet
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let bucket = self.bucket();
        let head = self.timed("head_bucket", bucket, async {
            self.client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| classify_for(Target::Bucket, "head_bucket", bucket, e))
        });

        match head.await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                self.timed("create_bucket", bucket, async {
                    self.client
                        .create_bucket()
                        .bucket(bucket)
                        .send()
                        .await
                        .map_err(|e| classify_for(Target::Bucket, "create_bucket", bucket, e))
                })
                .await?;
                info!(bucket, "created bucket");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run one request under the configured timeout and record it
    async fn timed<T, F>(&self, op: &'static str, key: &str, request: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                op,
                after: self.config.request_timeout,
            }),
        };
        let elapsed = started.elapsed();

        let succeeded = match &result {
            Ok(_) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                error!(op, key, error = %e, "storage request failed");
                false
            }
        };
        self.metrics.record(op, elapsed, succeeded);
        debug!(op, key, elapsed_ms = elapsed.as_millis() as u64, "storage request");

        result
    }
}

/// What a request addressed, for deciding what "missing" means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Bucket,
    Object,
}

/// Whether an error response says the addressed thing does not exist.
/// A missing bucket only counts when probing the bucket itself; for object
/// requests it is a configuration fault, not an absent key.
fn is_missing(target: Target, status: u16, code: Option<&str>) -> bool {
    match code {
        Some("NoSuchBucket") => target == Target::Bucket,
        Some("NoSuchKey" | "NotFound") => true,
        _ => status == 404,
    }
}

/// Turn an SDK error into a storage error, recognising missing keys
fn classify<E>(op: &'static str, key: &str, err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    classify_for(Target::Object, op, key, err)
}

fn classify_for<E>(
    target: Target,
    op: &'static str,
    key: &str,
    err: SdkError<E, HttpResponse>,
) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let not_found = match &err {
        SdkError::ServiceError(ctx) => is_missing(target, ctx.raw().status().as_u16(), err.code()),
        _ => false,
    };

    if not_found {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::backend(op, key, err)
    }
}

/// `x-amz-copy-source` value. S3 decodes the header, so every key segment is
/// percent-encoded while the `/` separators stay literal.
fn copy_source(bucket: &str, key: &str) -> String {
    let key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{bucket}/{key}")
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        let resp = self
            .timed("stat", key, async {
                self.client
                    .head_object()
                    .bucket(self.bucket())
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| classify("stat", key, e))
            })
            .await?;

        Ok(ObjectMeta {
            key: key.to_string(),
            size: resp.content_length().unwrap_or(0).max(0) as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<ObjectReader, StorageError> {
        let resp = self
            .timed("get", key, async {
                self.client
                    .get_object()
                    .bucket(self.bucket())
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| classify("get", key, e))
            })
            .await?;

        Ok(Box::pin(resp.body.into_async_read()))
    }

    async fn put(&self, key: &str, body: ObjectBody) -> Result<(), StorageError> {
        let length = body
            .content_length()
            .await
            .map_err(|e| StorageError::backend("put", key, e))?;
        let stream = match body {
            ObjectBody::Bytes(data) => ByteStream::from(data),
            ObjectBody::File(path) => ByteStream::from_path(&path)
                .await
                .map_err(|e| StorageError::backend("put", key, e))?,
        };

        self.timed("put", key, async {
            self.client
                .put_object()
                .bucket(self.bucket())
                .key(key)
                .content_length(length as i64)
                .body(stream)
                .send()
                .await
                .map_err(|e| classify("put", key, e))
        })
        .await?;
        Ok(())
    }

    async fn copy(&self, source: &str, target: &str) -> Result<(), StorageError> {
        let source_header = copy_source(self.bucket(), source);
        self.timed("copy", source, async {
            self.client
                .copy_object()
                .bucket(self.bucket())
                .copy_source(&source_header)
                .key(target)
                .send()
                .await
                .map_err(|e| classify("copy", source, e))
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.timed("delete", key, async {
            self.client
                .delete_object()
                .bucket(self.bucket())
                .key(key)
                .send()
                .await
                .map_err(|e| classify("delete", key, e))
        })
        .await?;
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, StorageError> {
        let mut failures = Vec::new();

        for chunk in keys.chunks(DELETE_BATCH_LIMIT) {
            let first = chunk[0].as_str();
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StorageError::backend("delete_batch", first, e))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::backend("delete_batch", first, e))?;

            let resp = self
                .timed("delete_batch", first, async {
                    self.client
                        .delete_objects()
                        .bucket(self.bucket())
                        .delete(delete)
                        .send()
                        .await
                        .map_err(|e| classify("delete_batch", first, e))
                })
                .await?;

            failures.extend(resp.errors().iter().map(|e| DeleteFailure {
                key: e.key().unwrap_or_default().to_string(),
                message: e.message().unwrap_or("unknown error").to_string(),
            }));
        }

        Ok(failures)
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectEntry>, StorageError> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(self.bucket())
            .prefix(prefix);
        if !recursive {
            req = req.delimiter("/");
        }

        let mut pages = req.into_paginator().send();
        let mut entries = Vec::new();

        // Each page is its own request, so each gets its own timeout
        while let Some(page) = self
            .timed("list", prefix, async {
                pages
                    .next()
                    .await
                    .transpose()
                    .map_err(|e| classify("list", prefix, e))
            })
            .await?
        {
            entries.extend(page.contents().iter().map(|obj| ObjectEntry {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                is_dir: false,
            }));

            entries.extend(
                page.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix())
                    .map(|key| ObjectEntry {
                        key: key.to_string(),
                        size: 0,
                        is_dir: true,
                    }),
            );
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_encodes_segments() {
        assert_eq!(
            copy_source("user-files", "user-7-files/docs/a.txt"),
            "user-files/user-7-files/docs/a.txt"
        );
        assert_eq!(
            copy_source("user-files", "user-7-files/a+b 100%.txt"),
            "user-files/user-7-files/a%2Bb%20100%25.txt"
        );
        assert_eq!(
            copy_source("user-files", "user-7-files/résumé.pdf"),
            "user-files/user-7-files/r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(
            copy_source("user-files", "user-7-files/dir/"),
            "user-files/user-7-files/dir/"
        );
    }

    #[test]
    fn test_missing_bucket_is_not_a_missing_key() {
        assert!(is_missing(Target::Object, 404, Some("NoSuchKey")));
        assert!(is_missing(Target::Object, 404, Some("NotFound")));
        assert!(is_missing(Target::Object, 404, None));
        assert!(!is_missing(Target::Object, 404, Some("NoSuchBucket")));
        assert!(is_missing(Target::Bucket, 404, Some("NoSuchBucket")));
        assert!(!is_missing(Target::Object, 403, Some("AccessDenied")));
        assert!(!is_missing(Target::Object, 500, None));
    }
}
