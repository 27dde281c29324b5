//! Knowledge graph schema module
//!
//! Node types and the Cypher operations over them. Every function takes the
//! `neo4rs::Graph` first, so they compose with a shared [`crate::GraphClient`].

pub mod challenge;
pub mod debate;
pub mod feedback;
pub mod job;
pub mod metrics;
pub mod ontology;
pub mod puzzle;
pub mod types;

pub use types::{
    AttemptRecord, DashboardReport, DebateEntry, Domain, FeedbackStatus, Job, JobStatus,
    OntologyEdge, OntologyRule, ReasoningChallenge, RuleFeedback, SessionFeedback,
};
pub use challenge::store_reasoning_challenge;
pub use debate::{fetch_debate_history, store_debate_message};
pub use feedback::{
    apply_rule_refinement, create_rule_feedback, mark_rules_validated_by, pending_feedback,
    session_feedback, submit_session_feedback, task_corrections,
};
pub use job::{get_job, submit_job, update_job_status};
pub use metrics::{
    dashboard_report, log_ai_trust_verification, log_causal_validation,
    log_counterfactual_failures,
};
pub use ontology::{
    fetch_domain_relationships, get_ontology_rule, link_ontology_rules,
    log_counterexample_failure, store_validated_rule, upsert_ontology_rule,
};
pub use puzzle::{list_attempts, proposed_solutions, query_solution, record_attempt};
