use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Method, Request, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::storage::{DurableStore, TOKEN_KEY};
use crate::config::Deployment;

pub const PRODUCTION_BASE_URL: &str = "https://brightsteps.app/api/v1";
pub const LOCAL_BASE_URL: &str = "http://localhost:8080/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build request")]
    Build(#[source] reqwest::Error),
    #[error("request failed")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response body")]
    Decode(#[source] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn for_deployment(deployment: Deployment) -> Self {
        let base_url = match deployment {
            Deployment::Production => PRODUCTION_BASE_URL,
            Deployment::Development => LOCAL_BASE_URL,
        };
        Self {
            base_url: base_url.to_string(),
        }
    }

    /// `API_BASE_URL` wins; otherwise the base follows `APP_ENV`.
    pub fn from_env() -> Self {
        match std::env::var("API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self {
                base_url: url.trim().trim_end_matches('/').to_string(),
            },
            _ => Self::for_deployment(Deployment::from_env()),
        }
    }
}

/// HTTP client that signs every request with the token found in storage.
///
/// The token is read from the store per request, so a login or logout through
/// any [`SessionContext`](super::session::SessionContext) sharing the store is
/// picked up immediately. Requests are sent once; there is no retry.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Option<Arc<dyn DurableStore>>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        store: Option<Arc<dyn DurableStore>>,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn stored_token(&self) -> Option<String> {
        self.store
            .as_ref()
            .and_then(|s| s.get(TOKEN_KEY))
            .filter(|t| !t.is_empty())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds a request for `path`, attaching `Authorization: Bearer` when a token is stored.
    /// `Content-Type` comes from the client's default headers at send time.
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Request, ClientError> {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = self.stored_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.build().map_err(ClientError::Build)
    }

    /// Dispatches once. Non-2xx responses become [`ClientError::Status`].
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let res = self
            .http
            .execute(request)
            .await
            .map_err(ClientError::Transport)?;
        let status = res.status();
        debug!(%method, %url, %status, "api response");
        if status.is_success() {
            return Ok(res);
        }
        let message = match res.json::<serde_json::Value>().await {
            Ok(body) => body["error"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        warn!(%method, %url, %status, %message, "api request failed");
        Err(ClientError::Status { status, message })
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(method, path, body)?;
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(ClientError::Decode)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.call::<(), T>(Method::GET, path, None).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, Some(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let req = self.request::<()>(Method::DELETE, path, None)?;
        self.send(req).await?;
        Ok(())
    }
}
