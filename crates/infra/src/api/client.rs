//! Base-URL-scoped JSON/binary client over [`HttpClient`].

use std::time::Duration;

use esusync_domain::SyncError;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Configuration for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, e.g. `http://192.168.0.10:5000`.
    pub base_url: String,
    pub timeout: Duration,
    /// Total attempts for idempotent requests.
    pub max_attempts: usize,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

/// JSON/binary REST client scoped to one backend base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, SyncError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .build()?;
        // Trailing slashes would produce double-slash paths.
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a JSON resource (retried).
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.http.send(self.http.request(Method::GET, &url)).await?;
        Self::decode_json(response, &url).await
    }

    /// GET a raw response (retried); used for artifact downloads.
    pub async fn get_raw(&self, path: &str) -> Result<Response, SyncError> {
        let url = self.url(path);
        debug!(%url, "GET (raw)");
        let response = self.http.send(self.http.request(Method::GET, &url)).await?;
        Self::ensure_success(response, &url).await
    }

    /// POST a JSON body and ignore the response payload. Not retried:
    /// job submissions must never be silently resubmitted.
    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), SyncError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let request = self.http.request(Method::POST, &url).json(body);
        let response = self.http.send_once(request).await?;
        Self::ensure_success(response, &url).await?;
        Ok(())
    }

    /// POST with an empty body, returning the raw response. Not retried.
    pub async fn post_raw(&self, path: &str) -> Result<Response, SyncError> {
        let url = self.url(path);
        debug!(%url, "POST (raw)");
        let request = self.http.request(Method::POST, &url);
        self.http.send_once(request).await
    }

    /// DELETE a resource (not retried).
    pub async fn delete(&self, path: &str) -> Result<(), SyncError> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        let response = self.http.send_once(self.http.request(Method::DELETE, &url)).await?;
        Self::ensure_success(response, &url).await?;
        Ok(())
    }

    async fn decode_json<T: DeserializeOwned>(
        response: Response,
        url: &str,
    ) -> Result<T, SyncError> {
        let response = Self::ensure_success(response, url).await?;
        response.json::<T>().await.map_err(|err| InfraError::from(err).into())
    }

    async fn ensure_success(response: Response, url: &str) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(map_status(status, url, &snippet))
    }
}

fn map_status(status: StatusCode, url: &str, body: &str) -> SyncError {
    match status {
        StatusCode::NOT_FOUND => SyncError::NotFound(format!("{url}: {body}")),
        s if s.is_client_error() => {
            SyncError::InvalidInput(format!("{url} returned {s}: {body}"))
        }
        s => SyncError::Network(format!("{url} returned {s}: {body}")),
    }
}
