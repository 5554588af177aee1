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

// Configuration types for unistore

use crate::storage::BackendKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnistoreConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration with backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend identifier: "minio", "s3", "filesystem"
    pub backend: BackendKind,

    /// Backend-specific configuration
    #[serde(flatten)]
    pub backend_config: BackendConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Minio,
            backend_config: BackendConfig::S3 {
                s3: S3Config::default(),
            },
        }
    }
}

impl StorageConfig {
    pub fn s3(backend: BackendKind, s3: S3Config) -> Self {
        Self {
            backend,
            backend_config: BackendConfig::S3 { s3 },
        }
    }

    pub fn filesystem(root: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Filesystem,
            backend_config: BackendConfig::Filesystem {
                filesystem: FilesystemConfig { root: root.into() },
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BackendConfig {
    S3 {
        #[serde(rename = "s3")]
        s3: S3Config,
    },
    Filesystem {
        #[serde(rename = "filesystem")]
        filesystem: FilesystemConfig,
    },
}

impl BackendConfig {
    pub fn as_s3(&self) -> Option<&S3Config> {
        match self {
            BackendConfig::S3 { s3 } => Some(s3),
            _ => None,
        }
    }

    pub fn as_s3_mut(&mut self) -> Option<&mut S3Config> {
        match self {
            BackendConfig::S3 { s3 } => Some(s3),
            _ => None,
        }
    }

    pub fn as_filesystem(&self) -> Option<&FilesystemConfig> {
        match self {
            BackendConfig::Filesystem { filesystem } => Some(filesystem),
            _ => None,
        }
    }

    pub fn as_filesystem_mut(&mut self) -> Option<&mut FilesystemConfig> {
        match self {
            BackendConfig::Filesystem { filesystem } => Some(filesystem),
            _ => None,
        }
    }
}

/// Connection settings for an S3-compatible object store (MinIO, AWS S3)
#[derive(Clone, Deserialize, Serialize)]
pub struct S3Config {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,

    /// Host and optional port, without scheme: `play.min.io:9000`
    pub endpoint: String,

    #[serde(default)]
    pub is_ssl: bool,

    /// Private buckets are only reachable through signed URLs
    #[serde(default)]
    pub is_private: bool,

    #[serde(default = "default_region")]
    pub region: String,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            bucket: String::new(),
            endpoint: "localhost:9000".to_string(),
            is_ssl: false,
            is_private: false,
            region: default_region(),
            path_style: default_path_style(),
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("is_ssl", &self.is_ssl)
            .field("is_private", &self.is_private)
            .field("region", &self.region)
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl S3Config {
    /// Full endpoint URL with the scheme picked from `is_ssl`
    ///
    /// The endpoint must be a bare host with an optional port.
    pub fn endpoint_url(&self) -> Result<Url, String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err("endpoint is empty".to_string());
        }
        if endpoint.contains("://") {
            return Err(format!(
                "endpoint '{}' must not include a scheme, use is_ssl instead",
                endpoint
            ));
        }

        let scheme = if self.is_ssl { "https" } else { "http" };
        let url = Url::parse(&format!("{}://{}", scheme, endpoint))
            .map_err(|e| format!("invalid endpoint '{}': {}", endpoint, e))?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(format!("endpoint '{}' has no host", endpoint));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(format!(
                "endpoint '{}' must be a host[:port] without path or query",
                endpoint
            ));
        }

        Ok(url)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesystemConfig {
    /// Directory objects are stored under
    pub root: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            root: "/var/lib/unistore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_region() -> String { "us-east-1".to_string() }
fn default_path_style() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
