//! Rule reasoning: Prolog-style rule checks and LLM counterexample search

pub mod counterexample;
pub mod rules;

pub use counterexample::{CounterexampleFinder, CounterexampleReport, Rejection};
pub use rules::{propose_rule, Clause, RuleError, RuleValidator, RuleVerdict, TestCase};

use crate::ids;
use anyhow::{Context, Result};
use arc_trainer_kg::KnowledgeStore;
use serde::Serialize;

/// A validated rule and the id its metrics are stored under
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    pub rule_id: String,
    #[serde(flatten)]
    pub verdict: RuleVerdict,
}

/// Validate a rule and record the outcome
///
/// Causal validation and counterfactual failures are always logged; the
/// rule definition is stored only when it is valid.
pub async fn validate_and_record(
    store: &dyn KnowledgeStore,
    rule: &str,
    cases: &[TestCase],
) -> Result<RuleReport> {
    let verdict = RuleValidator::new().validate(rule, cases)?;
    let rule_id = ids::rule_id(rule);

    store
        .log_causal_validation(&rule_id, verdict.valid)
        .await
        .context("Failed to log causal validation")?;
    store
        .log_counterfactual_failures(&rule_id, verdict.counterfactual_failures)
        .await
        .context("Failed to log counterfactual failures")?;
    if verdict.valid {
        store
            .store_validated_rule(&rule_id, &verdict.rule)
            .await
            .context("Failed to store validated rule")?;
        tracing::info!("Stored rule {}", rule_id);
    }

    Ok(RuleReport { rule_id, verdict })
}
