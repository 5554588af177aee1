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

// Backend registry with one-shot initialization per backend identifier

use super::backend::{BackendKind, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::factory::BackendFactory;
use crate::config::StorageConfig;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Cached outcome of initializing one backend
///
/// The error is shared so every caller observes the same failure.
pub type InitOutcome = Result<Arc<dyn StorageBackend>, Arc<StorageError>>;

/// Process-wide storage context
///
/// Owns the identifier to backend map and the initialization state of each
/// identifier. Share it between subsystems (typically in an `Arc`) so that
/// every caller resolves a backend identifier to the same instance.
#[derive(Default)]
pub struct StorageContext {
    backends: DashMap<BackendKind, Arc<dyn StorageBackend>>,
    init_cells: DashMap<BackendKind, Arc<OnceCell<InitOutcome>>>,
}

impl StorageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct, initialize and register the backend named by `config`
    ///
    /// Only the first call per identifier builds anything. Every later call
    /// for that identifier returns the cached outcome, whatever config it
    /// passes, including a cached failure: a failed identifier stays failed
    /// for the lifetime of this context.
    pub async fn init(&self, config: &StorageConfig) -> InitOutcome {
        self.init_with(config.backend, || async {
            let backend = BackendFactory::create(config)?;
            backend.initialize().await?;
            Ok::<_, StorageError>(backend)
        })
        .await
    }

    /// Same guarantees as [`init`](Self::init) with a caller supplied
    /// constructor, so custom backends can be registered under an identifier
    pub async fn init_with<F, Fut>(&self, kind: BackendKind, construct: F) -> InitOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StorageResult<Arc<dyn StorageBackend>>>,
    {
        let cell = self.init_cells.entry(kind).or_default().value().clone();

        cell.get_or_init(|| async {
            let outcome = match construct().await {
                Ok(backend) => self.register(kind, Arc::clone(&backend)).map(|()| backend),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(backend) => {
                    info!("Storage backend '{}' initialized", kind);
                    Ok(backend)
                }
                Err(e) => {
                    error!("Storage backend '{}' failed to initialize: {}", kind, e);
                    Err(Arc::new(e))
                }
            }
        })
        .await
        .clone()
    }

    /// Register an initialized backend; each identifier may be registered once
    pub fn register(&self, kind: BackendKind, backend: Arc<dyn StorageBackend>) -> StorageResult<()> {
        match self.backends.entry(kind) {
            Entry::Occupied(_) => Err(StorageError::AlreadyRegistered(kind)),
            Entry::Vacant(entry) => {
                entry.insert(backend);
                info!("Registered storage backend '{}'", kind);
                Ok(())
            }
        }
    }

    /// Backend previously registered under `kind`
    pub fn lookup(&self, kind: BackendKind) -> Option<Arc<dyn StorageBackend>> {
        self.backends.get(&kind).map(|entry| Arc::clone(entry.value()))
    }

    /// Identifiers with a registered backend
    pub fn registered(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|entry| *entry.key()).collect()
    }
}
