//! # ARC Trainer Knowledge Graph (arc-trainer-kg)
//!
//! Neo4j persistence for the ARC reasoning trainer: puzzle attempts, debate
//! logs, ontology rules, user feedback and rule metrics.
//!
//! ## Connecting
//!
//! ```no_run
//! use arc_trainer_kg::GraphClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GraphClient::new(
//!         "bolt://localhost:7687",
//!         "neo4j",
//!         "password",
//!         "neo4j"
//!     ).await?;
//!
//!     let result = client.health_check_with_retry().await;
//!     println!("Status: {:?} in {}ms", result.status, result.response_time_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Graph shape
//!
//! - `(:Attempt)-[:ATTEMPT_OF]->(:Task {name})` for every solve attempt
//! - `(:Task)-[:HAS_DEBATE]->(:DebateLog)` for the debate log
//! - `(:Feedback)-[:RELATES_TO]->(:OntologyRule)` for rule feedback
//! - `(:Session)-[:HAS_FEEDBACK]->(:Feedback)<-[:RECEIVED_FEEDBACK]-(:Task)`
//!   for session feedback
//!
//! ## Stores
//!
//! Application code talks to [`KnowledgeStore`]. Use [`GraphStore`] against
//! a live database and [`MemoryStore`] for tests and dry runs:
//!
//! ```no_run
//! use arc_trainer_kg::{AttemptRecord, KnowledgeStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let attempt = AttemptRecord::new("007bbfc7", "prompt", "[[1]]", Some("[[1]]".into()), true);
//!     store.record_attempt(&attempt).await?;
//!     println!("{:?}", store.detect_contradictions("007bbfc7").await?);
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod schema;
pub mod store;

// Re-export main types for convenience
pub use connection::{
    GraphClient, HealthCheckConfig, HealthCheckMethod, HealthCheckResult, HealthStatus,
};
pub use error::{GraphError, Result};
pub use schema::types::{
    AttemptRecord, DashboardReport, DebateEntry, Domain, FeedbackStatus, Job, JobStatus,
    OntologyEdge, OntologyRule, ReasoningChallenge, RuleFeedback, SessionFeedback,
};
pub use store::{ContradictionReport, GraphStore, KnowledgeStore, MemoryStore};
