use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::COOKIE;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, ConfigError};
use crate::models::{HistoryRecord, User};

/// The REST collaborators the client depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identity of the session owner.
    async fn current_user(&self) -> Result<User, ApiError>;
    async fn profile(&self, user_id: &str) -> Result<User, ApiError>;
    /// Persisted messages exchanged with `peer_id`, oldest first.
    async fn chat_history(&self, peer_id: &str) -> Result<Vec<HistoryRecord>, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    data: Option<ChatPayload>,
}

#[derive(Deserialize, Default)]
struct ChatPayload {
    #[serde(default)]
    messages: Vec<HistoryRecord>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Every request, body included, is abandoned after `timeout`.
    pub fn new(base: Url, token: Option<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(ApiClient {
            client,
            base,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn request(&self, method: Method, path: &str) -> Result<String, ApiError> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = &self.token {
            request = request.header(COOKIE, format!("token={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("{} {} timed out", method, url);
                }
                ApiError::Network(e.to_string())
            })?;
        let status = response.status();
        debug!("{} {} -> {}", method, url, status);

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.request(Method::GET, path).await?;
        decode(path, &body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        warn!("response from /{} did not match its contract: {}", path, e);
        ApiError::Decode(e.to_string())
    })
}

#[async_trait]
impl Backend for ApiClient {
    async fn current_user(&self) -> Result<User, ApiError> {
        let envelope: Envelope<User> = self.get("profile/view").await?;
        Ok(envelope.data)
    }

    async fn profile(&self, user_id: &str) -> Result<User, ApiError> {
        let envelope: Envelope<User> = self.get(&format!("profile/{user_id}")).await?;
        Ok(envelope.data)
    }

    async fn chat_history(&self, peer_id: &str) -> Result<Vec<HistoryRecord>, ApiError> {
        let envelope: ChatEnvelope = self.get(&format!("chat/{peer_id}")).await?;
        Ok(envelope.data.unwrap_or_default().messages)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.request(Method::POST, "auth/logout").await.map(|_| ())
    }
}
