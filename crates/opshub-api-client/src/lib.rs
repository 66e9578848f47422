//! HTTP client for the OpsHub API.
//!
//! Provides a minimal client with optional Bearer auth, generic verb helpers,
//! and domain methods (auth, users, news, trainings, progress). The presigned
//! attachment upload flow lives in [`upload`] and the news-fetch progress
//! stream in [`fetch_stream`]. The CLI uses this client directly.

pub mod api;
pub mod error;
pub mod fetch_stream;
pub mod upload;

use opshub_core::ClientConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub use error::ApiError;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials (login, register, invite acceptance).
    Anonymous,
}

/// HTTP client for the OpsHub API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_prefix: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: &str, api_prefix: &str, auth: Auth) -> Result<Self, ApiError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        // No overall timeout: attachment PUTs can legitimately run for minutes.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn from_config(config: &ClientConfig, auth: Auth) -> Result<Self, ApiError> {
        Self::new(&config.api_url, &config.api_prefix(), auth)
    }

    /// Same connection pool, different credentials.
    pub fn with_auth(&self, auth: Auth) -> Self {
        Self {
            auth,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Bearer token in use, if any.
    pub fn token(&self) -> Option<&str> {
        match &self.auth {
            Auth::Bearer(token) => Some(token),
            Auth::Anonymous => None,
        }
    }

    /// Path under the API prefix, e.g. `/users/me` -> `/api/v1/users/me`.
    pub fn api_path(&self, path: &str) -> String {
        format!("{}{}", self.api_prefix, path)
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Anonymous => request,
        }
    }

    /// Send with auth and turn non-2xx statuses into classified errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.apply_auth(request).send().await?;
        ensure_success(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "GET");
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send_json(request).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "POST");
        self.send_json(self.client.post(&url).json(body)).await
    }

    /// POST a urlencoded form and deserialize response.
    pub async fn post_form<T: DeserializeOwned, F: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "POST form");
        self.send_json(self.client.post(&url).form(form)).await
    }

    /// POST without a body and deserialize response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "POST");
        self.send_json(self.client.post(&url)).await
    }

    /// POST JSON body, ignoring whatever the server answers on success.
    pub async fn post_json_discard<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(&url).json(body)).await?;
        Ok(())
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "PUT");
        self.send_json(self.client.put(&url).json(body)).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.build_url(path);
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Raw client for requests outside the API (presigned storage URLs).
    /// No auth is applied to requests built from it.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::debug!(status = status.as_u16(), %body, "API request failed");
    Err(ApiError::from_response(status, &body))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{}: {}", e, body)))
}

// Re-export domain types for convenience.
pub use fetch_stream::{FetchEvent, FetchOutcome, FetchReport, NewsFetcher};
pub use opshub_core::models::{
    Attachment, FetchCommand, FetchStatus, Invitation, Lesson, LoginResponse, Module,
    NewsSource, Post, ProgressData, Role, TokenPair, Training, TrainingListItem,
    TrainingManagementListItem, UploadDestination, User,
};
pub use upload::{
    BatchReport, LocalFile, UploadBackend, UploadEvent, UploadOrchestrator, UploadRow,
    UploadState,
};
