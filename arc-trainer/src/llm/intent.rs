use super::{LlmError, Result};
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the intent detection endpoint
#[derive(Clone)]
pub struct IntentClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl IntentClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Returns the service's JSON verbatim
    pub async fn analyze(&self, text: &str) -> Result<Value> {
        let mut request = self.http.post(&self.url).json(&json!({ "text": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Intent detection API error: {} - {}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let intent: Value = response.json().await?;
        tracing::info!("Intent analysis result: {}", intent);
        Ok(intent)
    }
}
