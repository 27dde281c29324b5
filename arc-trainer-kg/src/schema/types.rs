//! Type definitions for knowledge graph nodes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Convert status to string for Neo4j storage
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse status from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// A UUID-identified unit of submitted work (`:Job` node)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Arbitrary JSON payload, stored as text
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// New queued job with a fresh UUID
    pub fn new(data: JsonValue) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            data,
            created_at: Utc::now(),
        }
    }
}

/// One solve attempt for a named ARC puzzle (`:Attempt` node)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    /// Puzzle file stem, the key of the `:Task` node
    pub task_name: String,
    pub prompt: String,
    /// Raw model reply
    pub llm_text: String,
    /// Parsed grid as JSON text, if the reply contained one
    pub proposed: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(
        task_name: impl Into<String>,
        prompt: impl Into<String>,
        llm_text: impl Into<String>,
        proposed: Option<String>,
        success: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_name: task_name.into(),
            prompt: prompt.into(),
            llm_text: llm_text.into(),
            proposed,
            success,
            created_at: Utc::now(),
        }
    }
}

/// A line of the debate log attached to a puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateEntry {
    pub task_name: String,
    pub text: String,
    /// Unix time in milliseconds
    pub timestamp: i64,
}

/// Ontology domains a rule may belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Legal,
    Healthcare,
    Education,
    AiEthics,
    Finance,
    Warfare,
    General,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Legal,
        Domain::Healthcare,
        Domain::Education,
        Domain::AiEthics,
        Domain::Finance,
        Domain::Warfare,
        Domain::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Legal => "legal",
            Domain::Healthcare => "healthcare",
            Domain::Education => "education",
            Domain::AiEthics => "ai_ethics",
            Domain::Finance => "finance",
            Domain::Warfare => "warfare",
            Domain::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|d| d.as_str() == wanted)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::General
    }
}

/// A rule stated in controlled natural language with its Prolog form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRule {
    pub id: String,
    pub cnl_rule: String,
    pub prolog_rule: String,
    pub domain: Domain,
}

/// A typed edge between two ontology rules of the same domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

/// Whether rule feedback has been folded into a refinement yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Processed,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Processed => "processed",
        }
    }
}

/// User feedback on an ontology rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFeedback {
    pub id: String,
    pub rule_id: String,
    pub feedback_text: String,
    pub user_id: String,
    pub domain: Domain,
    pub status: FeedbackStatus,
}

/// Feedback given during a training session, optionally about one puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeedback {
    pub id: String,
    pub task_name: Option<String>,
    pub rating: Option<i64>,
    pub comment: String,
    /// A corrected rule fragment supplied by the user
    pub correction: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionFeedback {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_name: None,
            rating: None,
            comment: comment.into(),
            correction: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_task(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = Some(task_name.into());
        self
    }

    pub fn with_rating(mut self, rating: i64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }
}

/// A puzzle prompt generated from an image caption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningChallenge {
    pub id: String,
    pub caption: String,
    pub prompt: String,
}

/// Aggregated rule and trust metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// Rule id to causal validation outcome
    pub causal_validation: BTreeMap<String, bool>,
    /// Query to AI-to-AI consistency score
    pub ai_trust_verification: BTreeMap<String, f64>,
    /// Rule id to accumulated counterfactual failures
    pub counterfactual_failures: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("QUEUED"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::parse("done"), None);
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!(Domain::parse("ai_ethics"), Some(Domain::AiEthics));
        assert_eq!(Domain::parse(" Legal "), Some(Domain::Legal));
        assert_eq!(Domain::parse("astrology"), None);
        assert_eq!(Domain::ALL.len(), 7);
        assert_eq!(Domain::default(), Domain::General);
    }

    #[test]
    fn test_domain_serde_matches_storage_name() {
        let json = serde_json::to_string(&Domain::AiEthics).unwrap();
        assert_eq!(json, "\"ai_ethics\"");
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new(serde_json::json!({"puzzle": "abc"}));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(uuid::Uuid::parse_str(&job.id).is_ok());
    }

    #[test]
    fn test_session_feedback_builder() {
        let fb = SessionFeedback::new("too easy")
            .for_task("007bbfc7")
            .with_rating(4)
            .with_correction("rotate(X)");
        assert_eq!(fb.task_name.as_deref(), Some("007bbfc7"));
        assert_eq!(fb.rating, Some(4));
        assert_eq!(fb.correction.as_deref(), Some("rotate(X)"));
    }
}
