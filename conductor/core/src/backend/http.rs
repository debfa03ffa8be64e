//! HTTP Backend Implementation
//!
//! Chat backend talking JSON to the SmartChat server.
//!
//! # Server API
//!
//! - `GET /` - Health
//! - `POST /text-to-text` - `{prompt}` → `{answer}`
//! - `POST /text-to-image` - `{prompt}` → `{image_url}`
//! - `GET /get-chats` - `[{id, title}]`
//! - `GET /get-chat/{id}` - `[{role, content, type?}]`
//! - `POST /save-chat` - `{chat_id, prompt, response, mode}` → `{chat_id}`
//! - `DELETE /delete-chat/{id}` - response ignored

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    ApiError, Generator, RemoteMessage, SaveRequest, SaveResponse, SessionStore, SessionSummary,
};
use crate::config::ApiConfig;
use crate::messages::SessionId;

#[derive(Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    image_url: String,
}

/// Chat server client
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, None)
    }

    /// Create a client with an overall request timeout
    ///
    /// `None` keeps the transport default.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(ApiError::Client)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create from `ApiConfig`
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::with_timeout(config.base_url.clone(), config.timeout)
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of `/{route}/{id}` with the id percent-encoded as one segment
    fn session_url(&self, route: &str, id: &SessionId) -> Result<reqwest::Url, ApiError> {
        let invalid = || ApiError::Other(format!("invalid server URL: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(route)
            .push(id.as_str());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_json_at(path, self.url(path)).await
    }

    async fn get_json_at<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: impl reqwest::IntoUrl + Send,
    ) -> Result<T, ApiError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| transport(endpoint, source))?;
        decode(endpoint, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|source| transport(path, source))?;
        decode(path, response).await
    }
}

fn transport(endpoint: &str, source: reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// Check the status and read the full body
async fn read_body(endpoint: &str, response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| transport(endpoint, source))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let body = read_body(endpoint, response).await?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[async_trait]
impl Generator for HttpBackend {
    fn name(&self) -> &'static str {
        "SmartChat"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.url("/"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ApiError> {
        let response: TextResponse = self
            .post_json("/text-to-text", &PromptRequest { prompt })
            .await?;
        Ok(response.answer)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, ApiError> {
        let response: ImageResponse = self
            .post_json("/text-to-image", &PromptRequest { prompt })
            .await?;
        Ok(response.image_url)
    }
}

#[async_trait]
impl SessionStore for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        self.get_json("/get-chats").await
    }

    async fn fetch_messages(&self, id: &SessionId) -> Result<Vec<RemoteMessage>, ApiError> {
        let url = self.session_url("get-chat", id)?;
        let endpoint = url.path().to_string();
        self.get_json_at(&endpoint, url).await
    }

    async fn save_exchange(&self, record: &SaveRequest) -> Result<SaveResponse, ApiError> {
        self.post_json("/save-chat", record).await
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), ApiError> {
        let url = self.session_url("delete-chat", id)?;
        let endpoint = url.path().to_string();
        let response = self
            .http_client
            .delete(url)
            .send()
            .await
            .map_err(|source| transport(&endpoint, source))?;

        // Body is ignored, only the status matters
        read_body(&endpoint, response).await.map(|_| ())
    }
}
