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

// Filesystem backend implementation

use super::backend::{url_ttl_secs, BackendKind, ObjectReader, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::fetch::{UrlFetcher, FILE_URL_EXPIRES_PARAM};
use super::key::normalize_key;
use crate::config::FilesystemConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Filesystem backend storing each object as a file under a root directory
///
/// Writes land in a temporary file next to the destination and are renamed
/// into place, so readers never observe a partially written object.
pub struct FilesystemBackend {
    root: PathBuf,
    fetcher: UrlFetcher,
}

impl FilesystemBackend {
    pub fn new(config: FilesystemConfig) -> StorageResult<Self> {
        let construction = |reason: String| StorageError::Construction {
            backend: BackendKind::Filesystem,
            reason,
        };

        if config.root.trim().is_empty() {
            return Err(construction("root directory is empty".to_string()));
        }

        // Signed file:// URLs need an absolute path
        let root = std::path::absolute(&config.root)
            .map_err(|e| construction(format!("cannot resolve root '{}': {}", config.root, e)))?;

        info!("Initializing filesystem backend at: {}", root.display());

        Ok(Self {
            root,
            fetcher: UrlFetcher::new(BackendKind::Filesystem)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized key and the file it maps to
    fn object_path(&self, key: &str) -> StorageResult<(String, PathBuf)> {
        let normalized = normalize_key(key);
        if normalized.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let path = self.root.join(&normalized);
        Ok((normalized, path))
    }

    /// Unique sibling of `path` used to stage a write
    fn staging_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4()))
    }

    async fn ensure_parent_directory(&self, op: &'static str, key: &str, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| StorageError::Io {
                op,
                key: key.to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Move a staged file into place, removing it if the rename fails
    async fn commit(&self, op: &'static str, key: &str, staged: &Path, path: &Path) -> StorageResult<()> {
        if let Err(e) = fs::rename(staged, path).await {
            discard_staged(staged).await;
            return Err(StorageError::Io {
                op,
                key: key.to_string(),
                source: e,
            });
        }
        Ok(())
    }
}

/// Best-effort removal of a staged file that will not be committed
async fn discard_staged(staged: &Path) {
    if let Err(e) = fs::remove_file(staged).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Left staging file {} behind: {}", staged.display(), e);
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn initialize(&self) -> StorageResult<()> {
        if self.root.is_dir() {
            info!("Root directory already exists: {}", self.root.display());
            return Ok(());
        }

        info!("Creating root directory: {}", self.root.display());
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Construction {
                backend: BackendKind::Filesystem,
                reason: format!("failed to create root directory {}: {}", self.root.display(), e),
            })
    }

    async fn put(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        length: u64,
        content_type: &str,
    ) -> StorageResult<()> {
        let (key, path) = self.object_path(key)?;
        self.ensure_parent_directory("put", &key, &path).await?;

        let staged = Self::staging_path(&path);
        debug!(
            "Writing {} bytes ({}) to {}",
            length,
            content_type,
            path.display()
        );

        let io_error = |e| StorageError::Io {
            op: "put",
            key: key.clone(),
            source: e,
        };

        let mut file = fs::File::create(&staged).await.map_err(io_error)?;
        let written = tokio::io::copy(&mut (&mut *reader).take(length), &mut file).await;
        let flushed = match written {
            Ok(written) => file.flush().await.map(|()| written),
            Err(e) => Err(e),
        };
        drop(file);

        let written = match flushed {
            Ok(written) => written,
            Err(e) => {
                discard_staged(&staged).await;
                return Err(io_error(e));
            }
        };

        if written != length {
            discard_staged(&staged).await;
            return Err(StorageError::LengthMismatch {
                key,
                declared: length,
                actual: written,
            });
        }

        self.commit("put", &key, &staged, &path).await
    }

    async fn put_file(
        &self,
        key: &str,
        local_file: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let (key, path) = self.object_path(key)?;
        self.ensure_parent_directory("put_file", &key, &path).await?;

        debug!(
            "Copying {} ({}) to {}",
            local_file.display(),
            content_type,
            path.display()
        );

        let staged = Self::staging_path(&path);
        if let Err(e) = fs::copy(local_file, &staged).await {
            discard_staged(&staged).await;
            return Err(StorageError::Io {
                op: "put_file",
                key,
                source: e,
            });
        }

        self.commit("put_file", &key, &staged, &path).await
    }

    async fn get(&self, key: &str) -> StorageResult<ObjectReader> {
        let (key, _) = self.object_path(key)?;
        let url = self.signed_url(&key, None).await?;
        self.fetcher.open(&url, &key).await
    }

    async fn exists(&self, key: &str) -> bool {
        let Ok((key, path)) = self.object_path(key) else {
            return false;
        };

        match fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(e) => {
                debug!("Treating '{}' as missing: {}", key, e);
                false
            }
        }
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        let (key, path) = self.object_path(key)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::io("size", &key, e))?;

        if !metadata.is_file() {
            return Err(StorageError::NotFound(key));
        }
        Ok(metadata.len())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let (key, path) = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Delete of missing object '{}' ignored", key);
                Ok(())
            }
            Err(e) => Err(StorageError::Io {
                op: "delete",
                key,
                source: e,
            }),
        }
    }

    async fn copy(&self, src_key: &str, dest_key: &str) -> StorageResult<()> {
        let (src_key, src_path) = self.object_path(src_key)?;
        let (dest_key, dest_path) = self.object_path(dest_key)?;

        let metadata = fs::metadata(&src_path)
            .await
            .map_err(|e| StorageError::io("copy", &src_key, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(src_key));
        }

        self.ensure_parent_directory("copy", &dest_key, &dest_path).await?;

        let staged = Self::staging_path(&dest_path);
        if let Err(e) = fs::copy(&src_path, &staged).await {
            warn!("Copy of '{}' to '{}' failed: {}", src_key, dest_key, e);
            discard_staged(&staged).await;
            return Err(StorageError::io("copy", &src_key, e));
        }

        debug!("Copied '{}' to '{}'", src_key, dest_key);
        self.commit("copy", &dest_key, &staged, &dest_path).await
    }

    async fn signed_url(&self, key: &str, ttl: Option<Duration>) -> StorageResult<String> {
        let (key, path) = self.object_path(key)?;
        let expiry_secs = url_ttl_secs(&key, ttl)?;

        let mut url = Url::from_file_path(&path).map_err(|()| StorageError::Signing {
            key: key.clone(),
            reason: format!("{} cannot be expressed as a file URL", path.display()),
        })?;

        let expires = chrono::Utc::now().timestamp() + i64::from(expiry_secs);
        url.query_pairs_mut()
            .append_pair(FILE_URL_EXPIRES_PARAM, &expires.to_string());

        Ok(url.into())
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }
}
