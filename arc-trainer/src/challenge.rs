//! Reasoning challenges generated from uploaded images

use crate::reasoning::Clause;
use crate::vision::Captioner;
use anyhow::{Context, Result};
use arc_trainer_kg::{KnowledgeStore, ReasoningChallenge};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("Image {0} is outside the upload directory")]
    OutsideUploadDir(PathBuf),

    #[error("Reasoning text is empty")]
    EmptyReasoning,
}

/// Verdict on a user's answer to a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasoningCheck {
    pub valid: bool,
    /// Set when the text parsed as a rule
    pub is_rule: bool,
    pub contradictions: Vec<String>,
}

pub fn challenge_prompt(caption: &str) -> String {
    format!(
        "Based on the image description '{}', generate a logical puzzle.",
        caption
    )
}

/// A rule is valid when its body has no contradictions; free text is valid
/// unless it mentions an error
pub fn validate_reasoning(text: &str) -> Result<ReasoningCheck, ChallengeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChallengeError::EmptyReasoning);
    }
    match Clause::parse(text) {
        Ok(clause) => {
            let contradictions = clause.contradictions();
            Ok(ReasoningCheck {
                valid: contradictions.is_empty(),
                is_rule: true,
                contradictions,
            })
        }
        Err(_) => Ok(ReasoningCheck {
            valid: !text.to_lowercase().contains("error"),
            is_rule: false,
            contradictions: Vec::new(),
        }),
    }
}

pub struct ChallengeService {
    captioner: Arc<dyn Captioner>,
    store: Arc<dyn KnowledgeStore>,
    upload_dir: PathBuf,
}

impl ChallengeService {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        store: Arc<dyn KnowledgeStore>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            captioner,
            store,
            upload_dir: upload_dir.into(),
        }
    }

    fn resolve(&self, image: &Path) -> Result<PathBuf> {
        let root = self.upload_dir.canonicalize().with_context(|| {
            format!("Upload directory {} is not accessible", self.upload_dir.display())
        })?;
        let candidate = if image.is_absolute() {
            image.to_path_buf()
        } else {
            self.upload_dir.join(image)
        };
        let resolved = candidate
            .canonicalize()
            .with_context(|| format!("Image {} not found", candidate.display()))?;
        if !resolved.starts_with(&root) {
            return Err(ChallengeError::OutsideUploadDir(image.to_path_buf()).into());
        }
        Ok(resolved)
    }

    /// Caption an uploaded image and store a puzzle prompt built from it
    pub async fn from_image(&self, image: &Path) -> Result<ReasoningChallenge> {
        let path = self.resolve(image)?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.png".to_string());

        let caption = self
            .captioner
            .caption(&bytes, &file_name)
            .await
            .with_context(|| format!("Failed to caption {}", file_name))?;
        let prompt = challenge_prompt(&caption);

        let challenge = self
            .store
            .store_reasoning_challenge(&caption, &prompt)
            .await
            .context("Failed to store reasoning challenge")?;
        tracing::info!("Reasoning challenge {} created from {}", challenge.id, file_name);
        Ok(challenge)
    }
}
