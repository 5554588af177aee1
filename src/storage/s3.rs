// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// S3-compatible backend implementation (MinIO, AWS S3)

use super::backend::{url_ttl_secs, BackendKind, ObjectReader, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::fetch::UrlFetcher;
use super::key::normalize_key;
use crate::config::S3Config;
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

/// Upper bound on the buffer reserved up front for a put
const PUT_PREALLOCATE_LIMIT: u64 = 8 * 1024 * 1024;

/// Object store client speaking the S3 protocol
pub struct S3Backend {
    kind: BackendKind,
    config: S3Config,
    bucket: Box<Bucket>,
    fetcher: UrlFetcher,
}

impl S3Backend {
    /// Build the client; no request is sent until the first operation
    pub fn new(kind: BackendKind, config: S3Config) -> StorageResult<Self> {
        let construction = |reason: String| StorageError::Construction {
            backend: kind,
            reason,
        };

        let endpoint = config.endpoint_url().map_err(construction)?;

        if config.bucket.trim().is_empty() {
            return Err(construction("bucket name is empty".to_string()));
        }
        if config.access_key_id.is_empty() != config.access_key_secret.is_empty() {
            return Err(construction(
                "access key id and secret must be set together".to_string(),
            ));
        }

        // Explicit keys keep rust-s3 from probing the environment or instance metadata
        let credentials = Credentials::new(
            Some(config.access_key_id.as_str()),
            Some(config.access_key_secret.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| construction(format!("invalid credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| construction(format!("failed to create bucket client: {}", e)))?;

        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        let fetcher = UrlFetcher::new(kind)?;

        info!(
            "Initialized {} backend for bucket '{}' at {} (private: {})",
            kind, config.bucket, endpoint, config.is_private
        );

        Ok(Self {
            kind,
            config,
            bucket,
            fetcher,
        })
    }

    pub fn bucket_name(&self) -> &str {
        &self.config.bucket
    }

    pub fn is_private(&self) -> bool {
        self.config.is_private
    }

    async fn upload(&self, key: &str, content: &[u8], content_type: &str) -> StorageResult<()> {
        debug!(
            "Uploading {} bytes to '{}' in bucket '{}'",
            content.len(),
            key,
            self.config.bucket
        );

        let response = self
            .bucket
            .put_object_with_content_type(key, content, content_type)
            .await
            .map_err(|e| s3_error("put", key, e))?;

        check_status("put", key, response.status_code())
    }

    /// HEAD the object and return its length
    async fn head_length(&self, key: &str) -> StorageResult<u64> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| s3_error("size", key, e))?;

        object_length(key, status, head.content_length)
    }
}

/// Normalize and reject keys that point at the bucket itself
fn object_key(key: &str) -> StorageResult<String> {
    let normalized = normalize_key(key);
    if normalized.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(normalized)
}

fn check_status(op: &'static str, key: &str, status: u16) -> StorageResult<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        status => Err(StorageError::Status {
            op,
            key: key.to_string(),
            status,
        }),
    }
}

/// Length reported by a HEAD response
fn object_length(key: &str, status: u16, content_length: Option<i64>) -> StorageResult<u64> {
    check_status("size", key, status)?;

    let length = content_length.ok_or_else(|| StorageError::Status {
        op: "size",
        key: key.to_string(),
        status,
    })?;

    u64::try_from(length).map_err(|e| StorageError::transport("size", key, e))
}

fn s3_error(op: &'static str, key: &str, error: S3Error) -> StorageError {
    match error {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        S3Error::HttpFailWithBody(status, _) => StorageError::Status {
            op,
            key: key.to_string(),
            status,
        },
        other => StorageError::transport(op, key, other),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn put(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        length: u64,
        content_type: &str,
    ) -> StorageResult<()> {
        let key = object_key(key)?;

        // TODO: stream bodies above the multipart threshold instead of buffering them
        // The declared length is only a hint until the stream delivers it
        let capacity = length.min(PUT_PREALLOCATE_LIMIT) as usize;
        let mut content = Vec::with_capacity(capacity);
        let read = (&mut *reader)
            .take(length)
            .read_to_end(&mut content)
            .await
            .map_err(|e| StorageError::Io {
                op: "put",
                key: key.clone(),
                source: e,
            })? as u64;

        if read != length {
            return Err(StorageError::LengthMismatch {
                key,
                declared: length,
                actual: read,
            });
        }

        self.upload(&key, &content, content_type).await
    }

    async fn put_file(
        &self,
        key: &str,
        local_file: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let key = object_key(key)?;

        let content = tokio::fs::read(local_file)
            .await
            .map_err(|e| StorageError::Io {
                op: "put_file",
                key: key.clone(),
                source: e,
            })?;

        self.upload(&key, &content, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<ObjectReader> {
        let key = object_key(key)?;
        let url = self.signed_url(&key, None).await?;

        debug!("Fetching '{}' through a presigned URL", key);
        self.fetcher.open(&url, &key).await
    }

    async fn exists(&self, key: &str) -> bool {
        let Ok(key) = object_key(key) else {
            return false;
        };

        match self.bucket.head_object(&key).await {
            Ok((_, status)) => (200..300).contains(&status),
            Err(e) => {
                debug!("Treating '{}' as missing after HEAD error: {}", key, e);
                false
            }
        }
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        let key = object_key(key)?;
        self.head_length(&key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = object_key(key)?;

        debug!("Deleting '{}' from bucket '{}'", key, self.config.bucket);

        let status = match self.bucket.delete_object(&key).await {
            Ok(response) => response.status_code(),
            Err(S3Error::HttpFailWithBody(404, _)) => 404,
            Err(e) => return Err(s3_error("delete", &key, e)),
        };

        match status {
            200..=299 | 404 => Ok(()),
            status => Err(StorageError::Status {
                op: "delete",
                key,
                status,
            }),
        }
    }

    async fn copy(&self, src_key: &str, dest_key: &str) -> StorageResult<()> {
        let src_key = object_key(src_key)?;
        let dest_key = object_key(dest_key)?;

        debug!(
            "Copying '{}' to '{}' in bucket '{}'",
            src_key, dest_key, self.config.bucket
        );

        // The copy source header must be percent-encoded
        let encoded_src = urlencoding::encode(&src_key);

        let status = self
            .bucket
            .copy_object_internal(&*encoded_src, &dest_key)
            .await
            .map_err(|e| s3_error("copy", &src_key, e))?;

        check_status("copy", &src_key, status)
    }

    async fn signed_url(&self, key: &str, ttl: Option<Duration>) -> StorageResult<String> {
        let key = object_key(key)?;
        let expiry_secs = url_ttl_secs(&key, ttl)?;

        self.bucket
            .presign_get(&key, expiry_secs, None)
            .await
            .map_err(|e| StorageError::Signing {
                key,
                reason: e.to_string(),
            })
    }

    fn backend_kind(&self) -> BackendKind {
        self.kind
    }
}
