use crate::error::{GraphError, Result};
use crate::schema::metrics::check_consistency_score;
use crate::schema::ontology::is_valid_relationship_type;
use crate::schema::types::*;
use crate::store::KnowledgeStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct PuzzleState {
    solution: Option<String>,
    llm_text: String,
    success: bool,
    attempts: u64,
}

#[derive(Debug, Default)]
struct RuleState {
    definition: Option<String>,
    causal_validation: Option<bool>,
    counterfactual_failures: Option<i64>,
}

#[derive(Debug, Default)]
struct State {
    jobs: HashMap<String, Job>,
    puzzles: HashMap<String, PuzzleState>,
    attempts: Vec<AttemptRecord>,
    debate: Vec<DebateEntry>,
    ontology: BTreeMap<String, OntologyRule>,
    edges: BTreeSet<(String, String, String)>,
    rules: BTreeMap<String, RuleState>,
    rule_feedback: BTreeMap<String, RuleFeedback>,
    sessions: HashMap<String, Vec<SessionFeedback>>,
    counterexamples: BTreeMap<String, (String, String)>,
    trust: BTreeMap<String, f64>,
    challenges: Vec<ReasoningChallenge>,
}

/// In-process [`KnowledgeStore`] with the same semantics as the graph store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempts recorded for a puzzle
    pub async fn attempt_count(&self, task_name: &str) -> u64 {
        self.state
            .read()
            .await
            .puzzles
            .get(task_name)
            .map(|p| p.attempts)
            .unwrap_or(0)
    }

    /// Latest raw reply and success flag recorded for a puzzle
    pub async fn latest_outcome(&self, task_name: &str) -> Option<(String, bool)> {
        self.state
            .read()
            .await
            .puzzles
            .get(task_name)
            .map(|p| (p.llm_text.clone(), p.success))
    }

    /// Logged counterexamples as `(example, reason)` pairs
    pub async fn counterexamples(&self) -> Vec<(String, String)> {
        self.state
            .read()
            .await
            .counterexamples
            .iter()
            .map(|(example, (reason, _))| (example.clone(), reason.clone()))
            .collect()
    }

    /// Definition stored for a validated rule
    pub async fn rule_definition(&self, rule_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .rules
            .get(rule_id)
            .and_then(|r| r.definition.clone())
    }

    pub async fn challenges(&self) -> Vec<ReasoningChallenge> {
        self.state.read().await.challenges.clone()
    }

    /// Status of a piece of rule feedback
    pub async fn feedback_status(&self, feedback_id: &str) -> Option<FeedbackStatus> {
        self.state
            .read()
            .await
            .rule_feedback
            .get(feedback_id)
            .map(|f| f.status)
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn submit_job(&self, data: &serde_json::Value) -> Result<Job> {
        let job = Job::new(data.clone());
        self.state
            .write()
            .await
            .jobs
            .insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.state.read().await.jobs.get(job_id).cloned())
    }

    async fn update_job_status(&self, job_id: &str, status: JobStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.jobs.get_mut(job_id) {
            Some(job) => {
                job.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let puzzle = state.puzzles.entry(attempt.task_name.clone()).or_default();
        puzzle.llm_text = attempt.llm_text.clone();
        puzzle.success = attempt.success;
        if attempt.proposed.is_some() {
            puzzle.solution = attempt.proposed.clone();
        }
        puzzle.attempts += 1;
        state.attempts.push(attempt.clone());
        Ok(())
    }

    async fn query_solution(&self, task_name: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .puzzles
            .get(task_name)
            .and_then(|p| p.solution.clone()))
    }

    async fn proposed_solutions(&self, task_name: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let distinct: BTreeSet<String> = state
            .attempts
            .iter()
            .filter(|a| a.task_name == task_name)
            .filter_map(|a| a.proposed.clone())
            .collect();
        Ok(distinct.into_iter().collect())
    }

    async fn list_attempts(&self, task_name: &str) -> Result<Vec<AttemptRecord>> {
        let state = self.state.read().await;
        let mut attempts: Vec<AttemptRecord> = state
            .attempts
            .iter()
            .filter(|a| a.task_name == task_name)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.created_at);
        Ok(attempts)
    }

    async fn store_debate_message(&self, task_name: &str, text: &str, timestamp: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.puzzles.entry(task_name.to_string()).or_default();
        state.debate.push(DebateEntry {
            task_name: task_name.to_string(),
            text: text.to_string(),
            timestamp,
        });
        Ok(())
    }

    async fn fetch_debate_history(&self, task_name: Option<&str>) -> Result<Vec<DebateEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<DebateEntry> = state
            .debate
            .iter()
            .filter(|d| task_name.map_or(true, |name| d.task_name == name))
            .cloned()
            .collect();
        entries.sort_by_key(|d| d.timestamp);
        Ok(entries)
    }

    async fn upsert_ontology_rule(&self, rule: &OntologyRule) -> Result<()> {
        self.state
            .write()
            .await
            .ontology
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn get_ontology_rule(&self, rule_id: &str) -> Result<Option<OntologyRule>> {
        Ok(self.state.read().await.ontology.get(rule_id).cloned())
    }

    async fn link_ontology_rules(
        &self,
        source_id: &str,
        target_id: &str,
        relationship: &str,
    ) -> Result<bool> {
        if !is_valid_relationship_type(relationship) {
            return Err(GraphError::ValidationError(format!(
                "Invalid relationship type: {}",
                relationship
            )));
        }
        let mut state = self.state.write().await;
        if !state.ontology.contains_key(source_id) || !state.ontology.contains_key(target_id) {
            return Ok(false);
        }
        state.edges.insert((
            source_id.to_string(),
            target_id.to_string(),
            relationship.to_string(),
        ));
        Ok(true)
    }

    async fn fetch_domain_relationships(&self, domain: Domain) -> Result<Vec<OntologyEdge>> {
        let state = self.state.read().await;
        let in_domain = |id: &str| state.ontology.get(id).map_or(false, |r| r.domain == domain);
        Ok(state
            .edges
            .iter()
            .filter(|(s, t, _)| in_domain(s) && in_domain(t))
            .map(|(s, t, r)| OntologyEdge {
                source: s.clone(),
                target: t.clone(),
                relationship: r.clone(),
            })
            .collect())
    }

    async fn store_validated_rule(&self, rule_id: &str, definition: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.rules.entry(rule_id.to_string()).or_default().definition =
            Some(definition.to_string());
        Ok(())
    }

    async fn log_counterexample_failure(&self, rule: &str, example: &str, reason: &str) -> Result<()> {
        self.state.write().await.counterexamples.insert(
            example.to_string(),
            (reason.to_string(), rule.to_string()),
        );
        Ok(())
    }

    async fn create_rule_feedback(&self, feedback: &RuleFeedback) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.ontology.contains_key(&feedback.rule_id) {
            return Err(GraphError::not_found("OntologyRule", feedback.rule_id.clone()));
        }
        state
            .rule_feedback
            .insert(feedback.id.clone(), feedback.clone());
        Ok(())
    }

    async fn pending_feedback(&self, rule_id: &str, domain: Domain) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let rule_in_domain = state
            .ontology
            .get(rule_id)
            .map_or(false, |r| r.domain == domain);
        if !rule_in_domain {
            return Ok(Vec::new());
        }
        Ok(state
            .rule_feedback
            .values()
            .filter(|f| f.rule_id == rule_id && f.status == FeedbackStatus::Pending)
            .map(|f| f.feedback_text.clone())
            .collect())
    }

    async fn apply_rule_refinement(
        &self,
        rule_id: &str,
        cnl_rule: &str,
        prolog_rule: &str,
    ) -> Result<usize> {
        let mut state = self.state.write().await;
        let rule = state
            .ontology
            .get_mut(rule_id)
            .ok_or_else(|| GraphError::not_found("OntologyRule", rule_id))?;
        rule.cnl_rule = cnl_rule.to_string();
        rule.prolog_rule = prolog_rule.to_string();

        let mut processed = 0;
        for feedback in state.rule_feedback.values_mut() {
            if feedback.rule_id == rule_id && feedback.status == FeedbackStatus::Pending {
                feedback.status = FeedbackStatus::Processed;
                processed += 1;
            }
        }
        Ok(processed)
    }

    async fn submit_session_feedback(&self, session_id: &str, feedback: &SessionFeedback) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(task_name) = &feedback.task_name {
            state.puzzles.entry(task_name.clone()).or_default();
        }
        state
            .sessions
            .entry(session_id.to_string())
            .or_default()
            .push(feedback.clone());
        Ok(())
    }

    async fn session_feedback(&self, session_id: &str) -> Result<Vec<SessionFeedback>> {
        let state = self.state.read().await;
        let mut entries = state.sessions.get(session_id).cloned().unwrap_or_default();
        entries.sort_by_key(|f| f.created_at);
        Ok(entries)
    }

    async fn task_corrections(&self, task_name: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let mut matching: Vec<&SessionFeedback> = state
            .sessions
            .values()
            .flatten()
            .filter(|f| f.task_name.as_deref() == Some(task_name))
            .collect();
        matching.sort_by_key(|f| f.created_at);
        Ok(matching
            .into_iter()
            .filter_map(|f| f.correction.clone())
            .filter(|c| !c.is_empty())
            .collect())
    }

    async fn mark_rules_validated_by(&self, correction: &str) -> Result<usize> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for rule in state.rules.values_mut() {
            if rule
                .definition
                .as_deref()
                .map_or(false, |d| d.contains(correction))
            {
                rule.causal_validation = Some(true);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn log_causal_validation(&self, rule_id: &str, success: bool) -> Result<()> {
        self.state
            .write()
            .await
            .rules
            .entry(rule_id.to_string())
            .or_default()
            .causal_validation = Some(success);
        Ok(())
    }

    async fn log_ai_trust_verification(&self, query: &str, score: f64) -> Result<()> {
        check_consistency_score(score)?;
        self.state
            .write()
            .await
            .trust
            .insert(query.to_string(), score);
        Ok(())
    }

    async fn log_counterfactual_failures(&self, rule_id: &str, failure_count: u32) -> Result<()> {
        let mut state = self.state.write().await;
        let rule = state.rules.entry(rule_id.to_string()).or_default();
        rule.counterfactual_failures =
            Some(rule.counterfactual_failures.unwrap_or(0) + i64::from(failure_count));
        Ok(())
    }

    async fn dashboard_report(&self) -> Result<DashboardReport> {
        let state = self.state.read().await;
        let mut report = DashboardReport {
            ai_trust_verification: state.trust.clone(),
            ..DashboardReport::default()
        };
        for (id, rule) in &state.rules {
            if let Some(valid) = rule.causal_validation {
                report.causal_validation.insert(id.clone(), valid);
            }
            if let Some(failures) = rule.counterfactual_failures {
                report.counterfactual_failures.insert(id.clone(), failures);
            }
        }
        Ok(report)
    }

    async fn store_reasoning_challenge(&self, caption: &str, prompt: &str) -> Result<ReasoningChallenge> {
        let challenge = ReasoningChallenge {
            id: uuid::Uuid::new_v4().to_string(),
            caption: caption.to_string(),
            prompt: prompt.to_string(),
        };
        self.state.write().await.challenges.push(challenge.clone());
        Ok(challenge)
    }
}
