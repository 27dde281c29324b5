use crate::connection::GraphClient;
use crate::error::Result;
use crate::schema::{self, types::*};
use crate::store::KnowledgeStore;
use async_trait::async_trait;

/// [`KnowledgeStore`] backed by Neo4j
pub struct GraphStore {
    client: GraphClient,
}

impl GraphStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

#[async_trait]
impl KnowledgeStore for GraphStore {
    async fn submit_job(&self, data: &serde_json::Value) -> Result<Job> {
        schema::submit_job(self.client.graph(), data).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        schema::get_job(self.client.graph(), job_id).await
    }

    async fn update_job_status(&self, job_id: &str, status: JobStatus) -> Result<bool> {
        schema::update_job_status(self.client.graph(), job_id, status).await
    }

    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        schema::record_attempt(self.client.graph(), attempt).await
    }

    async fn query_solution(&self, task_name: &str) -> Result<Option<String>> {
        schema::query_solution(self.client.graph(), task_name).await
    }

    async fn proposed_solutions(&self, task_name: &str) -> Result<Vec<String>> {
        schema::proposed_solutions(self.client.graph(), task_name).await
    }

    async fn list_attempts(&self, task_name: &str) -> Result<Vec<AttemptRecord>> {
        schema::list_attempts(self.client.graph(), task_name).await
    }

    async fn store_debate_message(&self, task_name: &str, text: &str, timestamp: i64) -> Result<()> {
        schema::store_debate_message(self.client.graph(), task_name, text, timestamp).await
    }

    async fn fetch_debate_history(&self, task_name: Option<&str>) -> Result<Vec<DebateEntry>> {
        schema::fetch_debate_history(self.client.graph(), task_name).await
    }

    async fn upsert_ontology_rule(&self, rule: &OntologyRule) -> Result<()> {
        schema::upsert_ontology_rule(self.client.graph(), rule).await
    }

    async fn get_ontology_rule(&self, rule_id: &str) -> Result<Option<OntologyRule>> {
        schema::get_ontology_rule(self.client.graph(), rule_id).await
    }

    async fn link_ontology_rules(
        &self,
        source_id: &str,
        target_id: &str,
        relationship: &str,
    ) -> Result<bool> {
        schema::link_ontology_rules(self.client.graph(), source_id, target_id, relationship).await
    }

    async fn fetch_domain_relationships(&self, domain: Domain) -> Result<Vec<OntologyEdge>> {
        schema::fetch_domain_relationships(self.client.graph(), domain).await
    }

    async fn store_validated_rule(&self, rule_id: &str, definition: &str) -> Result<()> {
        schema::store_validated_rule(self.client.graph(), rule_id, definition).await
    }

    async fn log_counterexample_failure(&self, rule: &str, example: &str, reason: &str) -> Result<()> {
        schema::log_counterexample_failure(self.client.graph(), rule, example, reason).await
    }

    async fn create_rule_feedback(&self, feedback: &RuleFeedback) -> Result<()> {
        schema::create_rule_feedback(self.client.graph(), feedback).await
    }

    async fn pending_feedback(&self, rule_id: &str, domain: Domain) -> Result<Vec<String>> {
        schema::pending_feedback(self.client.graph(), rule_id, domain).await
    }

    async fn apply_rule_refinement(
        &self,
        rule_id: &str,
        cnl_rule: &str,
        prolog_rule: &str,
    ) -> Result<usize> {
        schema::apply_rule_refinement(self.client.graph(), rule_id, cnl_rule, prolog_rule).await
    }

    async fn submit_session_feedback(&self, session_id: &str, feedback: &SessionFeedback) -> Result<()> {
        schema::submit_session_feedback(self.client.graph(), session_id, feedback).await
    }

    async fn session_feedback(&self, session_id: &str) -> Result<Vec<SessionFeedback>> {
        schema::session_feedback(self.client.graph(), session_id).await
    }

    async fn task_corrections(&self, task_name: &str) -> Result<Vec<String>> {
        schema::task_corrections(self.client.graph(), task_name).await
    }

    async fn mark_rules_validated_by(&self, correction: &str) -> Result<usize> {
        schema::mark_rules_validated_by(self.client.graph(), correction).await
    }

    async fn log_causal_validation(&self, rule_id: &str, success: bool) -> Result<()> {
        schema::log_causal_validation(self.client.graph(), rule_id, success).await
    }

    async fn log_ai_trust_verification(&self, query: &str, score: f64) -> Result<()> {
        schema::log_ai_trust_verification(self.client.graph(), query, score).await
    }

    async fn log_counterfactual_failures(&self, rule_id: &str, failure_count: u32) -> Result<()> {
        schema::log_counterfactual_failures(self.client.graph(), rule_id, failure_count).await
    }

    async fn dashboard_report(&self) -> Result<DashboardReport> {
        schema::dashboard_report(self.client.graph()).await
    }

    async fn store_reasoning_challenge(&self, caption: &str, prompt: &str) -> Result<ReasoningChallenge> {
        schema::store_reasoning_challenge(self.client.graph(), caption, prompt).await
    }
}
