//! Language model access over HTTP
//!
//! [`LanguageModel`] is the seam the solver and reasoning checks talk to.
//! [`LlmClient`] implements it against the configured completion service and
//! adds the causal, Socratic and multi-model consensus queries.

pub mod client;
pub mod intent;

pub use client::{CausalAnswer, Consensus, LlmClient};
pub use intent::IntentClient;

use async_trait::async_trait;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Service error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No model answered the consensus query")]
    NoAnswers,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else if err.is_decode() {
            LlmError::Parsing(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Anything that answers a prompt with text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String>;
}
