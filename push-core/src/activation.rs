//! Client side of the activation server, which tracks the state of users'
//! cryptographic activations and mints personalized encryption keys.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing;

use crate::config::PowerAuthConfig;
use crate::envelope::{ErrorDetail, ObjectRequest, ResponseStatus};
use crate::error::PushError;
use crate::types::EncryptionKey;

const ACTIVATION_STATUS_PATH: &str = "/rest/v3/activation/status";
const ENCRYPTION_KEY_PATH: &str = "/rest/v3/activation/encryption/key/create";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    Created,
    #[serde(alias = "OTP_USED")]
    PendingCommit,
    Active,
    Blocked,
    Removed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationStatusInfo {
    pub activation_id: String,
    #[serde(rename = "activationStatus")]
    pub status: ActivationStatus,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ActivationStatusInfo {
    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Active
    }
}

/// Operations the push server consumes from the activation server.
///
/// `Ok(None)` means the server answered but had nothing to return.
#[async_trait]
pub trait ActivationGateway: Send + Sync {
    async fn get_activation_status(
        &self,
        activation_id: &str,
    ) -> Result<Option<ActivationStatusInfo>, PushError>;

    async fn generate_encryption_key(
        &self,
        activation_id: &str,
        session_index: Option<&str>,
    ) -> Result<Option<EncryptionKey>, PushError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationStatusRequest<'a> {
    activation_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionKeyRequest<'a> {
    activation_id: &'a str,
    session_index: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    status: ResponseStatus,
    #[serde(default)]
    response_object: Option<serde_json::Value>,
}

/// REST client for the activation server.
pub struct PowerAuthRestClient {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl PowerAuthRestClient {
    pub fn new(config: &PowerAuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        tracing::info!("Activation server client configured for {}", config.url);

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: B) -> Result<Option<T>, PushError>
    where
        B: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&ObjectRequest::new(body));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Activation server request to {} failed: {}", path, e);
            PushError::GatewayUnavailable(e.to_string())
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("Activation server returned 404 for {}", path);
            return Ok(None);
        }
        if status.is_server_error() && !is_json(&response) {
            return Err(PushError::GatewayUnavailable(format!(
                "Activation server responded with {}",
                status
            )));
        }

        let raw: RawResponse = response.json().await.map_err(|e| {
            PushError::GatewayUnavailable(format!("Malformed activation server response: {}", e))
        })?;

        match (raw.status, raw.response_object) {
            (ResponseStatus::Ok, None) | (ResponseStatus::Ok, Some(serde_json::Value::Null)) => {
                Ok(None)
            }
            (ResponseStatus::Ok, Some(value)) => serde_json::from_value(value).map(Some).map_err(|e| {
                PushError::GatewayUnavailable(format!("Unexpected activation server payload: {}", e))
            }),
            (ResponseStatus::Error, value) => {
                let detail = value
                    .and_then(|v| serde_json::from_value::<ErrorDetail>(v).ok())
                    .unwrap_or_else(|| ErrorDetail {
                        code: "ERROR_GENERIC".to_string(),
                        message: format!("Activation server responded with {}", status),
                    });
                Err(PushError::GatewayError {
                    code: detail.code,
                    message: detail.message,
                })
            }
        }
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl ActivationGateway for PowerAuthRestClient {
    async fn get_activation_status(
        &self,
        activation_id: &str,
    ) -> Result<Option<ActivationStatusInfo>, PushError> {
        self.post(ACTIVATION_STATUS_PATH, ActivationStatusRequest { activation_id })
            .await
    }

    async fn generate_encryption_key(
        &self,
        activation_id: &str,
        session_index: Option<&str>,
    ) -> Result<Option<EncryptionKey>, PushError> {
        self.post(
            ENCRYPTION_KEY_PATH,
            EncryptionKeyRequest {
                activation_id,
                session_index,
            },
        )
        .await
    }
}
