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

// Storage backend module
//
// Provides a trait-based abstraction over object stores, so callers can
// pick a backend (MinIO, S3, local filesystem) by identifier at runtime
// and get the same key handling, rename, and URL signing semantics from
// each of them.

pub mod backend;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod filesystem;
pub mod key;
pub mod registry;
pub mod s3;

pub use backend::{
    url_ttl_secs, BackendKind, ObjectReader, StorageBackend, UnknownBackend, DEFAULT_URL_TTL,
    MAX_URL_TTL,
};
pub use error::{RenameError, StorageError, StorageResult};
pub use factory::BackendFactory;
pub use fetch::UrlFetcher;
pub use filesystem::FilesystemBackend;
pub use key::normalize_key;
pub use registry::{InitOutcome, StorageContext};
pub use s3::S3Backend;
