//! Store abstraction over the knowledge graph
//!
//! [`KnowledgeStore`] is what the application talks to. [`GraphStore`] runs
//! the schema operations against Neo4j; [`MemoryStore`] keeps the same data in
//! process for tests and dry runs.

mod graph;
mod memory;

pub use graph::GraphStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::schema::types::{
    AttemptRecord, DashboardReport, DebateEntry, Domain, Job, JobStatus, OntologyEdge,
    OntologyRule, ReasoningChallenge, RuleFeedback, SessionFeedback,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether the attempts on a puzzle agree on one grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ContradictionReport {
    /// At most one distinct grid was ever proposed
    Consistent { solution: Option<String> },
    /// Attempts proposed different grids
    Contradiction { solutions: Vec<String> },
}

impl ContradictionReport {
    pub fn from_proposals(mut proposals: Vec<String>) -> Self {
        proposals.sort();
        proposals.dedup();
        if proposals.len() > 1 {
            ContradictionReport::Contradiction {
                solutions: proposals,
            }
        } else {
            ContradictionReport::Consistent {
                solution: proposals.pop(),
            }
        }
    }

    pub fn is_contradiction(&self) -> bool {
        matches!(self, ContradictionReport::Contradiction { .. })
    }
}

/// Persistence operations used by the trainer
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    // Jobs
    async fn submit_job(&self, data: &serde_json::Value) -> Result<Job>;
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>>;
    async fn update_job_status(&self, job_id: &str, status: JobStatus) -> Result<bool>;

    // Puzzles
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()>;
    async fn query_solution(&self, task_name: &str) -> Result<Option<String>>;
    async fn proposed_solutions(&self, task_name: &str) -> Result<Vec<String>>;
    async fn list_attempts(&self, task_name: &str) -> Result<Vec<AttemptRecord>>;

    async fn detect_contradictions(&self, task_name: &str) -> Result<ContradictionReport> {
        let proposals = self.proposed_solutions(task_name).await?;
        let report = ContradictionReport::from_proposals(proposals);
        if report.is_contradiction() {
            tracing::warn!("Contradictions detected for task {}", task_name);
        }
        Ok(report)
    }

    // Debate
    async fn store_debate_message(&self, task_name: &str, text: &str, timestamp: i64)
        -> Result<()>;
    async fn fetch_debate_history(&self, task_name: Option<&str>) -> Result<Vec<DebateEntry>>;

    // Ontology
    async fn upsert_ontology_rule(&self, rule: &OntologyRule) -> Result<()>;
    async fn get_ontology_rule(&self, rule_id: &str) -> Result<Option<OntologyRule>>;
    async fn link_ontology_rules(&self, source_id: &str, target_id: &str, relationship: &str)
        -> Result<bool>;
    async fn fetch_domain_relationships(&self, domain: Domain) -> Result<Vec<OntologyEdge>>;
    async fn store_validated_rule(&self, rule_id: &str, definition: &str) -> Result<()>;
    async fn log_counterexample_failure(&self, rule: &str, example: &str, reason: &str)
        -> Result<()>;

    // Feedback
    async fn create_rule_feedback(&self, feedback: &RuleFeedback) -> Result<()>;
    async fn pending_feedback(&self, rule_id: &str, domain: Domain) -> Result<Vec<String>>;
    async fn apply_rule_refinement(&self, rule_id: &str, cnl_rule: &str, prolog_rule: &str)
        -> Result<usize>;
    async fn submit_session_feedback(&self, session_id: &str, feedback: &SessionFeedback)
        -> Result<()>;
    async fn session_feedback(&self, session_id: &str) -> Result<Vec<SessionFeedback>>;
    async fn task_corrections(&self, task_name: &str) -> Result<Vec<String>>;
    async fn mark_rules_validated_by(&self, correction: &str) -> Result<usize>;

    // Metrics
    async fn log_causal_validation(&self, rule_id: &str, success: bool) -> Result<()>;
    async fn log_ai_trust_verification(&self, query: &str, score: f64) -> Result<()>;
    async fn log_counterfactual_failures(&self, rule_id: &str, failure_count: u32) -> Result<()>;
    async fn dashboard_report(&self) -> Result<DashboardReport>;

    // Challenges
    async fn store_reasoning_challenge(&self, caption: &str, prompt: &str)
        -> Result<ReasoningChallenge>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_single_proposal_is_consistent() {
        let report = ContradictionReport::from_proposals(vec!["[[1]]".into(), "[[1]]".into()]);
        assert_eq!(
            report,
            ContradictionReport::Consistent {
                solution: Some("[[1]]".into())
            }
        );
    }

    #[test]
    fn test_report_no_proposals() {
        let report = ContradictionReport::from_proposals(vec![]);
        assert_eq!(report, ContradictionReport::Consistent { solution: None });
        assert!(!report.is_contradiction());
    }

    #[test]
    fn test_report_distinct_proposals() {
        let report = ContradictionReport::from_proposals(vec!["[[2]]".into(), "[[1]]".into()]);
        assert!(report.is_contradiction());
        assert_eq!(
            report,
            ContradictionReport::Contradiction {
                solutions: vec!["[[1]]".into(), "[[2]]".into()]
            }
        );
    }

    #[test]
    fn test_report_serializes_with_status_tag() {
        let json = serde_json::to_value(ContradictionReport::from_proposals(vec![])).unwrap();
        assert_eq!(json["status"], "consistent");
    }
}
