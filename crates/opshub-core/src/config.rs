//! Configuration module
//!
//! Client settings are read from the environment: API location, API version
//! prefix, session file location and the attachment size cap used for local
//! pre-validation.

use std::env;
use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_API_VERSION: &str = "v1";
const MAX_ATTACHMENT_SIZE_MB: u64 = 50;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend, without trailing slash or API prefix.
    pub api_url: String,
    /// API version segment, e.g. "v1" for `/api/v1`.
    pub api_version: String,
    /// Explicit session file location; `None` means the per-user default.
    pub session_file: Option<PathBuf>,
    pub max_attachment_size_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            session_file: None,
            max_attachment_size_bytes: MAX_ATTACHMENT_SIZE_MB * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Load from OPSHUB_API_URL (or API_URL), OPSHUB_API_VERSION,
    /// OPSHUB_SESSION_FILE and OPSHUB_MAX_ATTACHMENT_SIZE_MB.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let api_url = env::var("OPSHUB_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let api_version =
            env::var("OPSHUB_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        let session_file = env::var("OPSHUB_SESSION_FILE").ok().map(PathBuf::from);

        let max_attachment_size_mb = match env::var("OPSHUB_MAX_ATTACHMENT_SIZE_MB") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("OPSHUB_MAX_ATTACHMENT_SIZE_MB is not a number: {raw}"))?,
            Err(_) => MAX_ATTACHMENT_SIZE_MB,
        };

        let config = Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_version,
            session_file,
            max_attachment_size_bytes: megabytes_to_bytes(max_attachment_size_mb)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "API URL must start with http:// or https://, got '{}'",
                self.api_url
            ));
        }
        if self.api_version.trim().is_empty() || self.api_version.contains('/') {
            return Err(anyhow::anyhow!(
                "Invalid API version '{}'",
                self.api_version
            ));
        }
        Ok(())
    }

    /// API path prefix, e.g. "/api/v1".
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }
}

fn megabytes_to_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .with_context(|| format!("OPSHUB_MAX_ATTACHMENT_SIZE_MB too large: {mb}"))
}
