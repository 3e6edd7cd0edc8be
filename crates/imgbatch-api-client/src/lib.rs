//! HTTP client for the remote optimize endpoint.
//!
//! Provides a minimal client with optional X-API-Key auth, a
//! JSON POST helper, and [`RemoteTransformClient`], the remote variant of the
//! transform engine. Every call is a single attempt: no retry and no backoff.

pub mod api;

use imgbatch_core::{AppError, AppResult, Config};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use api::{
    OptimizeImage, OptimizeRequest, OptimizeResponse, OptimizeResult, RemoteTransformClient,
};

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// No credentials
    None,
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// HTTP client for the optimize API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Auth, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a client from the runtime configuration. An API key, when set, is
    /// sent as `X-API-Key`.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let auth = match &config.api_key {
            Some(key) => Auth::XApiKey(key.clone()),
            None => Auth::None,
        };
        Self::new(config.api_url.clone(), auth, config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }

    /// POST JSON body and deserialize response.
    ///
    /// Connection failures, timeouts and non-2xx statuses are transport errors;
    /// a body that does not match `T` is a malformed response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Transport(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response body: {}", e)))?;

        let body: T = serde_json::from_str(&text)?;
        Ok(body)
    }
}
