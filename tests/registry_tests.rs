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

// Concurrent initialization and lookup through the storage context

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use unistore::config::{FilesystemConfig, S3Config, StorageConfig};
use unistore::storage::{
    BackendKind, FilesystemBackend, StorageBackend, StorageContext, StorageError,
};

const CALLERS: usize = 16;

fn minio_config(endpoint: &str) -> StorageConfig {
    StorageConfig::s3(
        BackendKind::Minio,
        S3Config {
            access_key_id: "minioadmin".to_string(),
            access_key_secret: "minioadmin".to_string(),
            bucket: "uploads".to_string(),
            endpoint: endpoint.to_string(),
            ..S3Config::default()
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_init_returns_one_instance() {
    let context = Arc::new(StorageContext::new());
    let config = minio_config("127.0.0.1:9000");

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let context = Arc::clone(&context);
        let config = config.clone();
        handles.push(tokio::spawn(async move { context.init(&config).await }));
    }

    let mut backends = Vec::new();
    for handle in handles {
        backends.push(handle.await.unwrap().unwrap());
    }

    let first = &backends[0];
    assert!(backends.iter().all(|backend| Arc::ptr_eq(backend, first)));

    let registered = context.lookup(BackendKind::Minio).unwrap();
    assert!(Arc::ptr_eq(&registered, first));
    assert_eq!(context.registered(), vec![BackendKind::Minio]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_init_constructs_once() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_string_lossy().to_string();
    let context = Arc::new(StorageContext::new());
    let constructed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let context = Arc::clone(&context);
        let constructed = Arc::clone(&constructed);
        let root = root.clone();
        handles.push(tokio::spawn(async move {
            context
                .init_with(BackendKind::Filesystem, move || async move {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    // Widen the window for racing callers
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let backend: Arc<dyn StorageBackend> =
                        Arc::new(FilesystemBackend::new(FilesystemConfig { root })?);
                    Ok::<_, StorageError>(backend)
                })
                .await
        }));
    }

    let mut backends = Vec::new();
    for handle in handles {
        backends.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(backends.iter().all(|backend| Arc::ptr_eq(backend, &backends[0])));
    assert_eq!(context.registered(), vec![BackendKind::Filesystem]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_init_failure_is_shared() {
    let context = Arc::new(StorageContext::new());
    let config = minio_config("not a valid host");

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let context = Arc::clone(&context);
        let config = config.clone();
        handles.push(tokio::spawn(async move { context.init(&config).await }));
    }

    let mut errors = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => panic!("init with a malformed endpoint must fail"),
            Err(e) => errors.push(e),
        }
    }

    assert!(matches!(*errors[0], StorageError::Construction { .. }));
    assert!(errors.iter().all(|e| Arc::ptr_eq(e, &errors[0])));
    assert!(context.lookup(BackendKind::Minio).is_none());
    assert!(context.registered().is_empty());
}

#[tokio::test]
async fn test_failed_init_is_permanent() {
    let context = StorageContext::new();

    let first = context.init(&minio_config("")).await.err().unwrap();

    // A valid config for the same identifier does not retry construction
    let second = context
        .init(&minio_config("127.0.0.1:9000"))
        .await
        .err()
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(context.lookup(BackendKind::Minio).is_none());
}

#[tokio::test]
async fn test_later_init_ignores_new_config() {
    let first_root = TempDir::new().unwrap();
    let second_root = TempDir::new().unwrap();
    let context = StorageContext::new();

    let first = context
        .init(&StorageConfig::filesystem(first_root.path().to_string_lossy()))
        .await
        .unwrap();
    let second = context
        .init(&StorageConfig::filesystem(second_root.path().to_string_lossy()))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));

    second
        .put("marker", &mut &b"x"[..], 1, "text/plain")
        .await
        .unwrap();
    assert!(first_root.path().join("marker").exists());
    assert!(!second_root.path().join("marker").exists());
}

#[tokio::test]
async fn test_failure_does_not_affect_other_backends() {
    let temp_dir = TempDir::new().unwrap();
    let context = StorageContext::new();

    assert!(context.init(&minio_config("")).await.is_err());

    let filesystem = context
        .init(&StorageConfig::filesystem(temp_dir.path().to_string_lossy()))
        .await
        .unwrap();

    assert_eq!(filesystem.backend_kind(), BackendKind::Filesystem);
    assert!(context.lookup(BackendKind::Filesystem).is_some());
    assert!(context.lookup(BackendKind::Minio).is_none());
}

#[tokio::test]
async fn test_init_creates_filesystem_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested/objects");
    let context = StorageContext::new();

    context
        .init(&StorageConfig::filesystem(root.to_string_lossy()))
        .await
        .unwrap();

    assert!(root.is_dir());
}
