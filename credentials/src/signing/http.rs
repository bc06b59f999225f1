use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::errors::SigningError;
use super::remote::KeyManagementClient;
use super::remote::SignRequest;
use super::remote::VerifyRequest;

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    signature_valid: bool,
}

/// Key-management client speaking JSON over HTTP.
///
/// Posts to `{endpoint}/sign` and `{endpoint}/verify`.
pub struct HttpKeyManagementClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpKeyManagementClient {
    /// Create a client for the given service endpoint.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the key-management service
    /// * `timeout` - Deadline applied to every request
    ///
    /// # Errors
    /// * `Transport` - The HTTP client could not be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SigningError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SigningError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, path: &str, key_id: &str, body: &B) -> Result<R, SigningError>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, path))
            .json(body)
            .send()
            .await
            .map_err(|e| SigningError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SigningError::KeyNotFound(key_id.to_string()));
        }
        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(SigningError::Rejected(format!("{}: {}", status, message)));
        }
        if !status.is_success() {
            return Err(SigningError::Transport(format!(
                "unexpected status {}",
                status
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SigningError::Transport(e.to_string()))
    }
}

#[async_trait]
impl KeyManagementClient for HttpKeyManagementClient {
    async fn sign(&self, request: &SignRequest) -> Result<Vec<u8>, SigningError> {
        let response: SignResponse = self.post("sign", &request.key_id, request).await?;

        STANDARD
            .decode(response.signature)
            .map_err(|e| SigningError::Rejected(format!("malformed signature: {}", e)))
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<bool, SigningError> {
        let response: VerifyResponse = self.post("verify", &request.key_id, request).await?;
        Ok(response.signature_valid)
    }
}
