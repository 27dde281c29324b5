use super::{LanguageModel, LlmError, Result};
use crate::config::LlmSettings;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const CAUSAL_SUFFIX: &str = "Please explain why this is true using clear cause-effect relationships.";
const SOCRATIC_SUFFIX: &str = "Why is this the case? What would happen if the opposite were true?";

/// Answer to a causal query and whether the validator accepted it as causal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalAnswer {
    pub response: String,
    pub causal: bool,
}

/// Outcome of asking every consensus model the same prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Consensus {
    Agreement {
        response: String,
        score: f64,
    },
    Disagreement {
        responses: BTreeMap<String, String>,
        score: f64,
    },
}

impl Consensus {
    /// Share of answering models that gave the most common answer
    pub fn score(&self) -> f64 {
        match self {
            Consensus::Agreement { score, .. } | Consensus::Disagreement { score, .. } => *score,
        }
    }

    pub fn from_responses(responses: BTreeMap<String, String>) -> Result<Self> {
        if responses.is_empty() {
            return Err(LlmError::NoAnswers);
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for answer in responses.values() {
            *counts.entry(answer.trim()).or_insert(0) += 1;
        }
        let top = counts.values().copied().max().unwrap_or(0);
        let score = top as f64 / responses.len() as f64;

        if counts.len() == 1 {
            let response = responses.values().next().cloned().unwrap_or_default();
            Ok(Consensus::Agreement { response, score })
        } else {
            Ok(Consensus::Disagreement { responses, score })
        }
    }
}

/// HTTP client for the completion service
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    query_endpoint: String,
    validate_endpoint: String,
    models: Vec<String>,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            query_endpoint: settings.query_endpoint.clone(),
            validate_endpoint: settings.validate_endpoint.clone(),
            models: settings.consensus_models.clone(),
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let mut request = self.http.post(url).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("LLM API error: {} - {}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn query_url(&self, url: &str, prompt: &str) -> Result<String> {
        let reply = self.post_json(url, &json!({ "prompt": prompt })).await?;
        reply
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Parsing("reply has no \"response\" field".into()))
    }

    /// Ask with a cause-effect instruction, then have the service judge the answer
    pub async fn query_causal(&self, prompt: &str) -> Result<CausalAnswer> {
        let causal_prompt = format!("{}\n\n{}", prompt, CAUSAL_SUFFIX);
        tracing::debug!("Causal prompt: {}", causal_prompt);
        let response = self.ask(&causal_prompt).await?;

        let validation_query = format!(
            "Does the response '{}' provide a causal explanation for '{}'?",
            response, prompt
        );
        let url = format!("{}{}", self.api_url, self.validate_endpoint);
        let verdict = self
            .post_json(&url, &json!({ "query": validation_query }))
            .await?;
        let causal = verdict.get("valid").and_then(Value::as_bool).unwrap_or(false);
        if !causal {
            tracing::warn!("LLM response lacks causal reasoning");
        }

        Ok(CausalAnswer { response, causal })
    }

    /// Causal query that also asks the model to consider the opposite case
    pub async fn socratic(&self, prompt: &str) -> Result<CausalAnswer> {
        self.query_causal(&format!("{}\n\n{}", prompt, SOCRATIC_SUFFIX))
            .await
    }

    /// Ask each consensus model; models that fail are left out of the vote
    pub async fn consensus(&self, prompt: &str) -> Result<Consensus> {
        use futures::future::join_all;

        let queries = self.models.iter().map(|model| async move {
            let url = format!("{}/{}{}", self.api_url, model, self.query_endpoint);
            (model, self.query_url(&url, prompt).await)
        });

        let mut responses = BTreeMap::new();
        for (model, result) in join_all(queries).await {
            match result {
                Ok(answer) => {
                    responses.insert(model.clone(), answer);
                }
                Err(e) => tracing::warn!("Model {} did not answer: {}", model, e),
            }
        }

        let consensus = Consensus::from_responses(responses)?;
        if let Consensus::Disagreement { responses, .. } = &consensus {
            tracing::warn!("Inconsistent model responses: {:?}", responses);
        }
        Ok(consensus)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn ask(&self, prompt: &str) -> Result<String> {
        let url = format!("{}{}", self.api_url, self.query_endpoint);
        self.query_url(&url, prompt).await
    }
}
