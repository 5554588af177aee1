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

// Storage backend trait shared by every object store driver

use super::error::{RenameError, StorageError, StorageResult};
use super::key::normalize_key;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

/// Lifetime of a signed URL when the caller does not pick one
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest lifetime any backend will sign (the S3 presign ceiling)
pub const MAX_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Byte stream returned by `get`
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Backend identifier used for registration and lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Minio,
    S3,
    Filesystem,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Minio, BackendKind::S3, BackendKind::Filesystem];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Minio => "minio",
            BackendKind::S3 => "s3",
            BackendKind::Filesystem => "filesystem",
        }
    }

    /// Whether the backend speaks the S3 protocol
    pub fn is_s3_compatible(&self) -> bool {
        matches!(self, BackendKind::Minio | BackendKind::S3)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown storage backend '{0}' (supported: minio, s3, filesystem)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

/// Resolve the lifetime of a signed URL to whole seconds
///
/// Every backend applies the same rules: 24 hours when unset, at least one
/// second and at most [`MAX_URL_TTL`].
pub fn url_ttl_secs(key: &str, ttl: Option<Duration>) -> StorageResult<u32> {
    let ttl = ttl.unwrap_or(DEFAULT_URL_TTL);
    let secs = ttl.as_secs();

    if secs == 0 {
        return Err(StorageError::Signing {
            key: key.to_string(),
            reason: format!("TTL {:?} is shorter than one second", ttl),
        });
    }

    if ttl > MAX_URL_TTL {
        return Err(StorageError::Signing {
            key: key.to_string(),
            reason: format!(
                "TTL {}s exceeds the maximum of {}s",
                secs,
                MAX_URL_TTL.as_secs()
            ),
        });
    }

    // Bounded by MAX_URL_TTL above
    Ok(secs as u32)
}

/// Generic object storage backend
///
/// Every key-taking operation normalizes its key with
/// [`normalize_key`](super::key::normalize_key) before talking to the
/// backend. Implementations hold no per-call mutable state and may be shared
/// freely between tasks.
///
/// Nothing here retries: errors are surfaced to the caller as returned by
/// the transport.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Prepare the backend before first use (create directories, etc.)
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Upload exactly `length` bytes from `reader`, overwriting any object
    /// already stored under `key`
    async fn put(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        length: u64,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Upload a local file as a single object write
    async fn put_file(&self, key: &str, local_file: &Path, content_type: &str)
        -> StorageResult<()>;

    /// Open the object for reading through a freshly signed URL
    async fn get(&self, key: &str) -> StorageResult<ObjectReader>;

    /// Whether the object can currently be retrieved
    ///
    /// Every failure, transient or not, is reported as `false`. A `false`
    /// result is not a durable guarantee that the object is absent.
    async fn exists(&self, key: &str) -> bool;

    /// Object length in bytes, read from the backend's metadata
    async fn size(&self, key: &str) -> StorageResult<u64>;

    /// Remove the object. Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Server-side copy of `src_key` to `dest_key`, leaving the source intact
    async fn copy(&self, src_key: &str, dest_key: &str) -> StorageResult<()>;

    /// Copy `src_key` to `dest_key`, then delete `src_key`
    ///
    /// Not atomic. If the delete fails after a successful copy both objects
    /// exist, nothing is rolled back, and
    /// [`RenameError::CopiedButDeleteFailed`] is returned.
    ///
    /// Keys that normalize to the same object are rejected before anything
    /// is copied or deleted.
    async fn rename(&self, src_key: &str, dest_key: &str) -> Result<(), RenameError> {
        if normalize_key(src_key) == normalize_key(dest_key) {
            return Err(RenameError::CopyFailed(StorageError::InvalidKey(
                dest_key.to_string(),
            )));
        }

        self.copy(src_key, dest_key)
            .await
            .map_err(RenameError::CopyFailed)?;

        self.delete(src_key).await.map_err(|e| {
            warn!(
                "Rename of '{}' to '{}' left both objects in place: {}",
                src_key, dest_key, e
            );
            RenameError::CopiedButDeleteFailed(e)
        })?;

        debug!("Renamed '{}' to '{}'", src_key, dest_key);
        Ok(())
    }

    /// Time-limited retrieval URL for the object
    ///
    /// `ttl` defaults to [`DEFAULT_URL_TTL`]; see [`url_ttl_secs`].
    async fn signed_url(&self, key: &str, ttl: Option<Duration>) -> StorageResult<String>;

    /// Like [`signed_url`](Self::signed_url) but returns an empty string
    /// when signing fails
    async fn url(&self, key: &str, ttl: Option<Duration>) -> String {
        match self.signed_url(key, ttl).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to sign URL for '{}': {}", key, e);
                String::new()
            }
        }
    }

    /// Get backend type identifier
    fn backend_kind(&self) -> BackendKind;
}
