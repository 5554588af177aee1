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

// Opens signed URLs as byte streams
//
// `get` on every backend signs a URL and hands it here, so public and
// private buckets share one read path.

use super::backend::{BackendKind, ObjectReader};
use super::error::{StorageError, StorageResult};
use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

/// Query parameter carrying the unix expiry of a `file://` URL
pub const FILE_URL_EXPIRES_PARAM: &str = "expires";

/// Fetches `http(s)://` and `file://` URLs
pub struct UrlFetcher {
    client: Client,
}

impl UrlFetcher {
    pub fn new(backend: BackendKind) -> StorageResult<Self> {
        // No request timeout: callers wanting deadlines wrap the call
        let client = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::Construction {
                backend,
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Open `url` for reading; `key` is only used for error reporting
    pub async fn open(&self, url: &str, key: &str) -> StorageResult<ObjectReader> {
        let parsed = Url::parse(url).map_err(|e| StorageError::transport("get", key, e))?;

        match parsed.scheme() {
            "http" | "https" => self.open_http(parsed, key).await,
            "file" => open_file(&parsed, key).await,
            other => Err(StorageError::UnsupportedUrl {
                key: key.to_string(),
                reason: format!("unsupported URL scheme '{}'", other),
            }),
        }
    }

    async fn open_http(&self, url: Url, key: &str) -> StorageResult<ObjectReader> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::transport("get", key, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::Status {
                op: "get",
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            "Streaming '{}' ({} bytes advertised)",
            key,
            response.content_length().unwrap_or_default()
        );

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}

async fn open_file(url: &Url, key: &str) -> StorageResult<ObjectReader> {
    let expires = url
        .query_pairs()
        .find(|(name, _)| name == FILE_URL_EXPIRES_PARAM)
        .and_then(|(_, value)| value.parse::<i64>().ok());

    match expires {
        Some(expires) if expires < chrono::Utc::now().timestamp() => {
            return Err(StorageError::UrlExpired(key.to_string()));
        }
        Some(_) => {}
        None => {
            return Err(StorageError::UnsupportedUrl {
                key: key.to_string(),
                reason: "file URL carries no expiry".to_string(),
            });
        }
    }

    let path = url.to_file_path().map_err(|()| StorageError::UnsupportedUrl {
        key: key.to_string(),
        reason: format!("'{}' is not a local file URL", url),
    })?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| StorageError::io("get", key, e))?;
    if !metadata.is_file() {
        return Err(StorageError::NotFound(key.to_string()));
    }

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| StorageError::io("get", key, e))?;

    Ok(Box::new(file))
}
