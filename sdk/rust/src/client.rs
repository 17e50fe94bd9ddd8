use reqwest::Client;
use thiserror::Error;

use crate::types::{OpRequest, OpResult, ResultEnvelope};

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {result}")]
    Service { status: u16, result: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct FanoutClient {
    client: Client,
    base_url: String,
}

impl FanoutClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a batch and decode the ordered results.
    pub async fn execute(&self, request: &OpRequest) -> Result<OpResult, SdkError> {
        let resp = self.client.post(&self.base_url).json(request).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let result = serde_json::from_slice::<ResultEnvelope>(&bytes)
                .map(|e| e.result)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(SdkError::Service {
                status: status.as_u16(),
                result,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Liveness probe; returns the `result` field (normally `"ok"`).
    pub async fn health(&self) -> Result<String, SdkError> {
        let resp = self.client.get(&self.base_url).send().await?;
        let envelope: ResultEnvelope = resp.json().await?;
        Ok(envelope.result)
    }
}
