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

// Pluggable object storage with a process-wide backend registry
//
// - One async trait implemented by every backend (S3/MinIO, local filesystem)
// - Keys normalized identically before they reach any backend
// - Rename as copy-then-delete with explicit partial failure reporting
// - Time-limited signed URLs, also used to serve reads
// - Backends initialized at most once per identifier, then looked up by name

pub mod config;
pub mod storage;

// Re-export main types
pub use config::{load_config, load_config_with_env, StorageConfig, UnistoreConfig};
pub use storage::{
    normalize_key, BackendFactory, BackendKind, RenameError, StorageBackend, StorageContext,
    StorageError, StorageResult,
};
