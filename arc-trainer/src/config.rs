//! Runtime configuration from the environment and an optional JSON file

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path:?} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct GraphSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Clone)]
pub struct LlmSettings {
    pub api_url: String,
    /// Empty means no `Authorization` header
    pub api_key: String,
    pub timeout: Duration,
    pub query_endpoint: String,
    pub validate_endpoint: String,
    pub consensus_models: Vec<String>,
}

/// Remote image captioning (Hugging Face inference endpoint)
#[derive(Clone)]
pub struct CaptionSettings {
    pub endpoint: String,
    pub bearer_token: String,
}

#[derive(Clone)]
pub struct TrainerConfig {
    pub graph: GraphSettings,
    pub llm: LlmSettings,
    pub intent_url: String,
    pub captioner: Option<CaptionSettings>,
    pub dataset_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub log_level: String,
}

impl TrainerConfig {
    /// Read the process environment, loading `.env` first when present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let timeout_raw = get("LLM_TIMEOUT_SECS", "30");
        let timeout_secs: u64 = timeout_raw.trim().parse().map_err(|e| ConfigError::Invalid {
            key: "LLM_TIMEOUT_SECS".into(),
            message: format!("{}", e),
        })?;

        let consensus_models = get("LLM_CONSENSUS_MODELS", "model_a,model_b,model_c")
            .split(',')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        let captioner = match (lookup("HF_BLIP_ENDPOINT"), lookup("HF_BEARER_TOKEN")) {
            (Some(endpoint), Some(bearer_token))
                if !endpoint.trim().is_empty() && !bearer_token.trim().is_empty() =>
            {
                Some(CaptionSettings {
                    endpoint,
                    bearer_token,
                })
            }
            _ => None,
        };

        Ok(Self {
            graph: GraphSettings {
                uri: get("NEO4J_URI", "bolt://localhost:7687"),
                user: get("NEO4J_USER", "neo4j"),
                password: get("NEO4J_PASSWORD", "password"),
                database: get("NEO4J_DATABASE", "neo4j"),
            },
            llm: LlmSettings {
                api_url: get("LLM_API_URL", "http://localhost:8000"),
                api_key: lookup("LLM_API_KEY").unwrap_or_default(),
                timeout: Duration::from_secs(timeout_secs),
                query_endpoint: get("LLM_QUERY_ENDPOINT", "/query"),
                validate_endpoint: get("LLM_VALIDATE_ENDPOINT", "/validate"),
                consensus_models,
            },
            intent_url: get("INTENT_API_URL", "http://localhost:8000/api/intent"),
            captioner,
            dataset_dir: PathBuf::from(get("DATASET_DIR", "datasets")),
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "uploads")),
            export_dir: PathBuf::from(get("EXPORT_DIR", "exports")),
            log_level: get("LOG_LEVEL", "info"),
        })
    }

    /// Override the LLM section from a JSON config file
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_json(&value)
    }

    /// Every key is required once a file is given
    pub fn apply_json(&mut self, value: &Value) -> Result<(), ConfigError> {
        let api_url = required_str(value, &["llm_client", "api_url"])?;
        let api_key = required_str(value, &["llm_client", "api_key"])?;
        let timeout = required(value, &["llm_client", "timeout"])?
            .as_u64()
            .ok_or_else(|| ConfigError::Invalid {
                key: "llm_client.timeout".into(),
                message: "expected a whole number of seconds".into(),
            })?;
        let query = required_str(value, &["endpoints", "query"])?;
        let validate = required_str(value, &["endpoints", "validate"])?;

        self.llm.api_url = api_url;
        self.llm.api_key = api_key;
        self.llm.timeout = Duration::from_secs(timeout);
        self.llm.query_endpoint = query;
        self.llm.validate_endpoint = validate;
        Ok(())
    }

    /// Log everything except credentials
    pub fn log_summary(&self) {
        tracing::info!("Neo4j URI: {} (database {})", self.graph.uri, self.graph.database);
        tracing::info!(
            "LLM API: {}{} (timeout {}s, auth {})",
            self.llm.api_url,
            self.llm.query_endpoint,
            self.llm.timeout.as_secs(),
            if self.llm.api_key.is_empty() { "off" } else { "on" }
        );
        tracing::info!("Consensus models: {:?}", self.llm.consensus_models);
        tracing::info!("Intent API: {}", self.intent_url);
        match &self.captioner {
            Some(c) => tracing::info!("Captioner: remote {}", c.endpoint),
            None => tracing::info!("Captioner: local grid describer"),
        }
        tracing::info!(
            "Dataset dir: {:?}, upload dir: {:?}, export dir: {:?}",
            self.dataset_dir,
            self.upload_dir,
            self.export_dir
        );
        tracing::info!("Log level: {}", self.log_level);
    }
}

fn required<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value, ConfigError> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .ok_or_else(|| ConfigError::MissingKey(path.join(".")))
}

fn required_str(value: &Value, path: &[&str]) -> Result<String, ConfigError> {
    required(value, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Invalid {
            key: path.join("."),
            message: "expected a string".into(),
        })
}
