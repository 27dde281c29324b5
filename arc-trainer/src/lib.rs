//! # ARC Trainer
//!
//! Puzzle solving with language models on top of the `arc-trainer-kg`
//! knowledge graph: load an ARC task, render and caption it, ask a model for
//! the test output, parse and score the reply, and record the attempt.
//! Around that pipeline sit rule validation, counterexample search, user
//! feedback, ontology export and image-based reasoning challenges.

pub mod arc;
pub mod challenge;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod feedback;
pub mod ids;
pub mod llm;
pub mod reasoning;
pub mod solver;
pub mod vision;

pub use arc::{ArcTask, Dataset, Grid, Transformation};
pub use challenge::{validate_reasoning, ChallengeService};
pub use config::{ConfigError, TrainerConfig};
pub use export::{ExportFormat, Exporter};
pub use feedback::FeedbackService;
pub use llm::{LanguageModel, LlmClient};
pub use reasoning::{CounterexampleFinder, RuleValidator};
pub use solver::{AttemptOutcome, PuzzleSolver};
pub use vision::{Captioner, GridDescriber, HuggingFaceCaptioner};
