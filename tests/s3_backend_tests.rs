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

// S3 backend behavior that needs no running server
//
// Presigning is computed locally; operations that reach the network are
// pointed at a closed port to exercise the failure paths.

use std::time::Duration;
use unistore::config::S3Config;
use unistore::storage::{
    BackendKind, S3Backend, StorageBackend, StorageError, DEFAULT_URL_TTL, MAX_URL_TTL,
};

fn config_with_endpoint(endpoint: &str) -> S3Config {
    S3Config {
        access_key_id: "minioadmin".to_string(),
        access_key_secret: "minioadmin".to_string(),
        bucket: "uploads".to_string(),
        endpoint: endpoint.to_string(),
        ..S3Config::default()
    }
}

fn create_backend() -> S3Backend {
    S3Backend::new(BackendKind::Minio, config_with_endpoint("127.0.0.1:9000")).unwrap()
}

// Nothing listens on port 1
fn unreachable_backend() -> S3Backend {
    S3Backend::new(BackendKind::Minio, config_with_endpoint("127.0.0.1:1")).unwrap()
}

#[test]
fn test_construction_various_endpoints() {
    let endpoints = vec!["localhost:9000", "play.min.io", "10.0.0.1:9090", "s3.amazonaws.com"];

    for endpoint in endpoints {
        let backend = S3Backend::new(BackendKind::S3, config_with_endpoint(endpoint));
        assert!(backend.is_ok(), "endpoint {} should be accepted", endpoint);
    }
}

#[test]
fn test_construction_rejects_malformed_endpoints() {
    let endpoints = vec!["", "https://play.min.io", "host/with/path", "bad host"];

    for endpoint in endpoints {
        let result = S3Backend::new(BackendKind::Minio, config_with_endpoint(endpoint));
        assert!(
            matches!(result, Err(StorageError::Construction { backend: BackendKind::Minio, .. })),
            "endpoint {:?} should be rejected",
            endpoint
        );
    }
}

#[tokio::test]
async fn test_url_default_ttl_contains_key_and_expiry() {
    let backend = create_backend();

    let url = backend.url("/photos//cat.png", None).await;

    assert!(!url.is_empty());
    assert!(url.contains("uploads/photos/cat.png"));
    assert!(url.contains(&format!("X-Amz-Expires={}", DEFAULT_URL_TTL.as_secs())));
    assert!(url.contains("X-Amz-Signature="));
}

#[tokio::test]
async fn test_url_custom_ttl() {
    let backend = create_backend();

    let url = backend.url("report.pdf", Some(Duration::from_secs(600))).await;

    assert!(url.contains("X-Amz-Expires=600"));
}

#[tokio::test]
async fn test_url_signing_failure_returns_empty_string() {
    let backend = create_backend();

    let too_long = MAX_URL_TTL + Duration::from_secs(60);
    assert_eq!(backend.url("report.pdf", Some(too_long)).await, "");
    assert_eq!(backend.url("///", None).await, "");

    let result = backend.signed_url("report.pdf", Some(too_long)).await;
    assert!(matches!(result, Err(StorageError::Signing { .. })));
}

#[tokio::test]
async fn test_exists_collapses_errors_to_false() {
    let backend = unreachable_backend();

    assert!(!backend.exists("anything").await);
}

#[tokio::test]
async fn test_operations_surface_transport_errors() {
    let backend = unreachable_backend();

    assert!(backend.size("anything").await.is_err());
    assert!(backend.delete("anything").await.is_err());
    assert!(backend.get("anything").await.is_err());
    assert!(backend
        .put("anything", &mut &b"data"[..], 4, "text/plain")
        .await
        .is_err());
}

#[tokio::test]
async fn test_rename_reports_copy_failure() {
    let backend = unreachable_backend();

    let error = backend.rename("src", "dest").await.unwrap_err();
    assert!(!error.is_partial());
}

#[tokio::test]
async fn test_put_checks_declared_length_before_upload() {
    let backend = unreachable_backend();

    let result = backend
        .put("short", &mut &b"abc"[..], 10, "text/plain")
        .await;

    assert!(matches!(
        result,
        Err(StorageError::LengthMismatch { declared: 10, actual: 3, .. })
    ));
}

#[tokio::test]
async fn test_put_with_huge_declared_length_reports_mismatch() {
    let backend = unreachable_backend();

    let result = backend
        .put("huge", &mut &b"abc"[..], u64::MAX, "text/plain")
        .await;

    assert!(matches!(
        result,
        Err(StorageError::LengthMismatch { declared: u64::MAX, actual: 3, .. })
    ));
}

#[tokio::test]
async fn test_invalid_keys_rejected() {
    let backend = create_backend();

    assert!(matches!(backend.size("/").await, Err(StorageError::InvalidKey(_))));
    assert!(matches!(backend.delete("").await, Err(StorageError::InvalidKey(_))));
    assert!(!backend.exists("").await);
}
