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

// Error types for storage backends

use super::backend::BackendKind;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by backend construction and object operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid configuration or client construction failure during init
    #[error("failed to construct {backend} backend: {reason}")]
    Construction { backend: BackendKind, reason: String },

    #[error("backend '{0}' is already registered")]
    AlreadyRegistered(BackendKind),

    /// The key is empty once normalized, or names the source of a rename
    /// as its destination
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("{op} '{key}' failed with HTTP status {status}")]
    Status {
        op: &'static str,
        key: String,
        status: u16,
    },

    #[error("{op} '{key}' failed: {source}")]
    Transport {
        op: &'static str,
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{op} '{key}' failed: {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("declared length {declared} for '{key}' but the stream yielded {actual} bytes")]
    LengthMismatch {
        key: String,
        declared: u64,
        actual: u64,
    },

    #[error("cannot sign URL for '{key}': {reason}")]
    Signing { key: String, reason: String },

    #[error("signed URL for '{0}' has expired")]
    UrlExpired(String),

    /// The URL handed to the fetcher cannot be opened
    #[error("cannot fetch '{key}': {reason}")]
    UnsupportedUrl { key: String, reason: String },
}

impl StorageError {
    pub(crate) fn transport<E>(op: &'static str, key: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Transport {
            op,
            key: key.to_string(),
            source: Box::new(source),
        }
    }

    /// Map an I/O error on an object path, folding `NotFound` into the
    /// storage level variant
    pub(crate) fn io(op: &'static str, key: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io {
                op,
                key: key.to_string(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Outcome of a failed copy-then-delete rename
///
/// Rename is not atomic and never rolls back. `CopiedButDeleteFailed` means
/// both the source and the destination now exist; the caller must treat the
/// rename as failed and may retry deleting the source.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("rename failed while copying: {0}")]
    CopyFailed(#[source] StorageError),

    #[error("rename copied the object but failed to delete the source: {0}")]
    CopiedButDeleteFailed(#[source] StorageError),
}

impl RenameError {
    /// True when the destination was written and the source still exists
    pub fn is_partial(&self) -> bool {
        matches!(self, RenameError::CopiedButDeleteFailed(_))
    }

    pub fn into_inner(self) -> StorageError {
        match self {
            RenameError::CopyFailed(e) | RenameError::CopiedButDeleteFailed(e) => e,
        }
    }
}
