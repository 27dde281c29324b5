//! User feedback on ontology rules and training sessions

use crate::ids;
use crate::llm::LanguageModel;
use anyhow::{Context, Result};
use arc_trainer_kg::{Domain, FeedbackStatus, KnowledgeStore, RuleFeedback, SessionFeedback};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("No pending feedback for rule {rule_id} in domain {domain}")]
    NoPendingFeedback { rule_id: String, domain: Domain },

    #[error("Feedback text is empty")]
    EmptyFeedback,
}

/// New rule text produced from pending feedback
#[derive(Debug, Clone, Serialize)]
pub struct Refinement {
    pub rule_id: String,
    pub updated_cnl_rule: String,
    pub updated_prolog_rule: String,
    pub feedback_processed: usize,
}

pub struct FeedbackService {
    llm: Arc<dyn LanguageModel>,
    store: Arc<dyn KnowledgeStore>,
}

impl FeedbackService {
    pub fn new(llm: Arc<dyn LanguageModel>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { llm, store }
    }

    /// Attach pending feedback to a rule; the id is derived from the text
    pub async fn store_feedback(
        &self,
        rule_id: &str,
        feedback_text: &str,
        user_id: &str,
        domain: Domain,
    ) -> Result<RuleFeedback> {
        if feedback_text.trim().is_empty() {
            return Err(FeedbackError::EmptyFeedback.into());
        }
        let feedback = RuleFeedback {
            id: ids::feedback_id(feedback_text),
            rule_id: rule_id.to_string(),
            feedback_text: feedback_text.to_string(),
            user_id: user_id.to_string(),
            domain,
            status: FeedbackStatus::Pending,
        };
        self.store
            .create_rule_feedback(&feedback)
            .await
            .with_context(|| format!("Failed to store feedback for rule {}", rule_id))?;
        tracing::info!("Feedback stored for rule {} in domain '{}'", rule_id, domain);
        Ok(feedback)
    }

    /// Rewrite a rule from its pending feedback and mark that feedback processed
    pub async fn refine_rule(&self, rule_id: &str, domain: Domain) -> Result<Refinement> {
        let pending = self.store.pending_feedback(rule_id, domain).await?;
        if pending.is_empty() {
            return Err(FeedbackError::NoPendingFeedback {
                rule_id: rule_id.to_string(),
                domain,
            }
            .into());
        }

        let mut prompt = format!(
            "Improve this ontology rule based on user feedback: {}",
            pending.join(" ")
        );
        if let Some(rule) = self.store.get_ontology_rule(rule_id).await? {
            prompt.push_str(&format!("\n\nCurrent rule: {}", rule.cnl_rule));
        }
        let refined_cnl = self
            .llm
            .ask(&prompt)
            .await
            .context("LLM refinement of the rule failed")?;
        let refined_prolog = self
            .llm
            .ask(&format!("Convert this refined rule into Prolog: {}", refined_cnl))
            .await
            .context("LLM conversion to Prolog failed")?;

        let processed = self
            .store
            .apply_rule_refinement(rule_id, &refined_cnl, &refined_prolog)
            .await?;
        tracing::info!(
            "Ontology rule {} refined from {} pieces of feedback in domain '{}'",
            rule_id,
            processed,
            domain
        );

        Ok(Refinement {
            rule_id: rule_id.to_string(),
            updated_cnl_rule: refined_cnl,
            updated_prolog_rule: refined_prolog,
            feedback_processed: processed,
        })
    }

    pub async fn submit_session_feedback(
        &self,
        session_id: &str,
        feedback: &SessionFeedback,
    ) -> Result<()> {
        self.store
            .submit_session_feedback(session_id, feedback)
            .await
            .with_context(|| format!("Failed to store feedback for session {}", session_id))?;
        tracing::info!("Feedback {} stored for session {}", feedback.id, session_id);
        Ok(())
    }

    async fn validate_corrections(&self, corrections: &[String]) -> Result<usize> {
        let mut validated = 0;
        for correction in corrections {
            validated += self.store.mark_rules_validated_by(correction).await?;
        }
        Ok(validated)
    }

    /// Mark rules matching a puzzle's corrections as causally validated
    pub async fn integrate_corrections(&self, task_name: &str) -> Result<usize> {
        let corrections = self.store.task_corrections(task_name).await?;
        let validated = self.validate_corrections(&corrections).await?;
        tracing::info!(
            "{} corrections for task {} validated {} rules",
            corrections.len(),
            task_name,
            validated
        );
        Ok(validated)
    }

    /// Same as [`Self::integrate_corrections`] for every correction in a session
    pub async fn update_from_session(&self, session_id: &str) -> Result<usize> {
        let entries = self.store.session_feedback(session_id).await?;
        if entries.is_empty() {
            tracing::warn!("No feedback found for session {}", session_id);
            return Ok(0);
        }
        let corrections: Vec<String> = entries.into_iter().filter_map(|f| f.correction).collect();
        let validated = self.validate_corrections(&corrections).await?;
        tracing::info!("Session {} validated {} rules", session_id, validated);
        Ok(validated)
    }
}
