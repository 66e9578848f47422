//! Test helpers: clients pointed at a mockito server and on-disk fixtures.
//!
//! Run from workspace root: `cargo test -p opshub-api-client`.

#![allow(dead_code)]

use mockito::ServerGuard;
use opshub_api_client::{ApiClient, Auth};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

pub const TEST_TOKEN: &str = "test-token";

/// API path prefix used by every test client.
pub fn api_path(path: &str) -> String {
    format!("/api/v1{}", path)
}

/// Client authenticated with [`TEST_TOKEN`].
pub fn authed_client(server: &ServerGuard) -> ApiClient {
    ApiClient::new(&server.url(), "/api/v1", Auth::Bearer(TEST_TOKEN.to_string())).unwrap()
}

pub fn anonymous_client(server: &ServerGuard) -> ApiClient {
    ApiClient::new(&server.url(), "/api/v1", Auth::Anonymous).unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {}", TEST_TOKEN)
}

pub fn user_json(id: i64, email: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "role": role,
        "is_active": true,
        "full_name": "Dana Operator",
        "company_name": "Acme Refining",
        "can_create_users": role != "user",
        "user_creation_limit": 10,
        "created_at": "2025-01-15T09:30:00.123456",
        "last_login": null,
        "users_created_count": 2,
        "status_locked": false
    })
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
