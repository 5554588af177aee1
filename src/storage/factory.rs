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

// Backend factory for creating storage backends from configuration

use super::backend::{BackendKind, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::filesystem::FilesystemBackend;
use super::s3::S3Backend;
use crate::config::StorageConfig;
use std::sync::Arc;

pub struct BackendFactory;

impl BackendFactory {
    /// Create storage backend from configuration
    ///
    /// The backend is constructed but not initialized; see
    /// [`StorageBackend::initialize`].
    pub fn create(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
        match config.backend {
            kind @ (BackendKind::Minio | BackendKind::S3) => {
                let backend_config =
                    config
                        .backend_config
                        .as_s3()
                        .ok_or_else(|| StorageError::Construction {
                            backend: kind,
                            reason: "s3 config missing".to_string(),
                        })?;

                let backend = S3Backend::new(kind, backend_config.clone())?;
                Ok(Arc::new(backend))
            }

            BackendKind::Filesystem => {
                let backend_config = config.backend_config.as_filesystem().ok_or_else(|| {
                    StorageError::Construction {
                        backend: BackendKind::Filesystem,
                        reason: "filesystem config missing".to_string(),
                    }
                })?;

                let backend = FilesystemBackend::new(backend_config.clone())?;
                Ok(Arc::new(backend))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, FilesystemConfig, S3Config};

    fn s3_config() -> S3Config {
        S3Config {
            access_key_id: "minioadmin".to_string(),
            access_key_secret: "minioadmin".to_string(),
            bucket: "uploads".to_string(),
            ..S3Config::default()
        }
    }

    #[test]
    fn test_create_minio_backend() {
        let storage_config = StorageConfig::s3(BackendKind::Minio, s3_config());

        let backend = BackendFactory::create(&storage_config);
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().backend_kind(), BackendKind::Minio);
    }

    #[test]
    fn test_create_s3_backend() {
        let storage_config = StorageConfig::s3(BackendKind::S3, s3_config());

        let backend = BackendFactory::create(&storage_config).unwrap();
        assert_eq!(backend.backend_kind(), BackendKind::S3);
    }

    #[test]
    fn test_create_filesystem_backend() {
        let storage_config = StorageConfig::filesystem("/tmp/unistore-factory-test");

        let backend = BackendFactory::create(&storage_config);
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().backend_kind(), BackendKind::Filesystem);
    }

    #[test]
    fn test_create_with_mismatched_config() {
        let storage_config = StorageConfig {
            backend: BackendKind::Minio,
            backend_config: BackendConfig::Filesystem {
                filesystem: FilesystemConfig::default(),
            },
        };

        let backend = BackendFactory::create(&storage_config);
        assert!(backend.is_err());
        if let Err(e) = backend {
            assert!(e.to_string().contains("s3 config missing"));
        }
    }
}
