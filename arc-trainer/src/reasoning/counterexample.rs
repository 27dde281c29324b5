use crate::llm::LanguageModel;
use anyhow::{Context, Result};
use arc_trainer_kg::KnowledgeStore;
use serde::Serialize;
use std::sync::Arc;

pub const REASON_FAIRNESS: &str = "Fails fairness constraint";
pub const REASON_SOCRATIC: &str = "Fails Socratic reasoning check";
pub const REASON_NEAR_ENEMY: &str = "Fails near enemy detection";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub example: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterexampleReport {
    pub rule: String,
    pub accepted: Vec<String>,
    pub rejected: Vec<Rejection>,
}

/// Generates counterexamples for a rule and keeps the ones that survive
/// fairness, causal justification and near-enemy checks
pub struct CounterexampleFinder {
    llm: Arc<dyn LanguageModel>,
    store: Arc<dyn KnowledgeStore>,
}

fn says_yes(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}

/// One example per non-empty line, list markers and heading lines removed
pub fn split_examples(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '•']).trim_start();
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            if digits > 0 && line[digits..].starts_with(['.', ')']) {
                line[digits + 1..].trim_start()
            } else {
                line
            }
        })
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .map(str::to_string)
        .collect()
}

impl CounterexampleFinder {
    pub fn new(llm: Arc<dyn LanguageModel>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { llm, store }
    }

    async fn ask(&self, query: String) -> Result<String> {
        self.llm.ask(&query).await.context("LLM query failed")
    }

    async fn violates_fairness(&self, example: &str) -> Result<bool> {
        let answer = self
            .ask(format!(
                "Does this rule, as applied to {}, introduce any bias?",
                example
            ))
            .await?;
        Ok(says_yes(&answer))
    }

    async fn justified(&self, rule: &str, example: &str) -> Result<bool> {
        let justification = self
            .ask(format!(
                "Why does {} hold in the case of {}? Provide a causal justification.",
                rule, example
            ))
            .await?;
        let verdict = self
            .ask(format!(
                "Does this explanation follow a sound causal chain? {}",
                justification
            ))
            .await?;
        let lower = verdict.to_lowercase();
        Ok(lower.contains("valid") && !lower.contains("invalid"))
    }

    async fn is_near_enemy(&self, rule: &str) -> Result<bool> {
        let answer = self
            .ask(format!(
                "Does the rule '{}' appear logically sound but introduce bias or deception?",
                rule
            ))
            .await?;
        Ok(says_yes(&answer))
    }

    async fn reject(&self, rule: &str, example: &str, reason: &str, out: &mut Vec<Rejection>) -> Result<()> {
        tracing::warn!("Counterexample {} rejected: {}", example, reason);
        self.store
            .log_counterexample_failure(rule, example, reason)
            .await
            .context("Failed to log counterexample")?;
        out.push(Rejection {
            example: example.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    pub async fn find(&self, rule: &str) -> Result<CounterexampleReport> {
        tracing::info!("Generating counterexamples for rule: {}", rule);
        let listing = self
            .ask(format!(
                "Generate multiple counterexamples that challenge the logic of the rule: {}. \
                 List one counterexample per line.",
                rule
            ))
            .await?;

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        // The near-enemy verdict depends only on the rule
        let mut near_enemy: Option<bool> = None;

        for example in split_examples(&listing) {
            if self.violates_fairness(&example).await? {
                self.reject(rule, &example, REASON_FAIRNESS, &mut rejected).await?;
                continue;
            }
            if !self.justified(rule, &example).await? {
                self.reject(rule, &example, REASON_SOCRATIC, &mut rejected).await?;
                continue;
            }
            let enemy = match near_enemy {
                Some(v) => v,
                None => {
                    let v = self.is_near_enemy(rule).await?;
                    near_enemy = Some(v);
                    v
                }
            };
            if enemy {
                self.reject(rule, &example, REASON_NEAR_ENEMY, &mut rejected).await?;
                continue;
            }
            accepted.push(example);
        }

        tracing::info!(
            "Rule {}: {} counterexamples accepted, {} rejected",
            rule,
            accepted.len(),
            rejected.len()
        );
        Ok(CounterexampleReport {
            rule: rule.to_string(),
            accepted,
            rejected,
        })
    }
}
