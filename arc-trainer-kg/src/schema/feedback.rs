//! Feedback operations
//!
//! Two kinds of feedback share the `:Feedback` label:
//! - rule feedback, `(f)-[:RELATES_TO]->(:OntologyRule)`, folded into rule
//!   refinements
//! - session feedback, `(:Session)-[:HAS_FEEDBACK]->(f)`, optionally linked
//!   from a puzzle via `RECEIVED_FEEDBACK`

use crate::error::{GraphError, Result};
use crate::schema::types::{Domain, RuleFeedback, SessionFeedback};
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph};

/// Store rule feedback; the target rule must already exist
pub async fn create_rule_feedback(graph: &Graph, feedback: &RuleFeedback) -> Result<()> {
    let cypher = query(
        "MATCH (r:OntologyRule {id: $rule_id})
         MERGE (f:Feedback {id: $id})
         SET f.rule_id = $rule_id,
             f.feedback_text = $feedback_text,
             f.user_id = $user_id,
             f.domain = $domain,
             f.status = $status
         MERGE (f)-[:RELATES_TO]->(r)
         RETURN f.id AS id",
    )
    .param("id", feedback.id.clone())
    .param("rule_id", feedback.rule_id.clone())
    .param("feedback_text", feedback.feedback_text.clone())
    .param("user_id", feedback.user_id.clone())
    .param("domain", feedback.domain.as_str())
    .param("status", feedback.status.as_str());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to store feedback", e))?;

    let stored = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read feedback result", e))?
        .is_some();

    if stored {
        Ok(())
    } else {
        Err(GraphError::not_found("OntologyRule", feedback.rule_id.clone()))
    }
}

/// Texts of pending feedback for a rule in a domain
pub async fn pending_feedback(graph: &Graph, rule_id: &str, domain: Domain) -> Result<Vec<String>> {
    let cypher = query(
        "MATCH (f:Feedback)-[:RELATES_TO]->(r:OntologyRule {id: $rule_id})
         WHERE r.domain = $domain AND f.status = 'pending'
         RETURN f.feedback_text AS feedback_text
         ORDER BY f.id",
    )
    .param("rule_id", rule_id.to_string())
    .param("domain", domain.as_str());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch pending feedback", e))?;

    let mut texts = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read feedback row", e))?
    {
        texts.push(row.get("feedback_text").unwrap_or_default());
    }

    Ok(texts)
}

/// Write a refined rule and mark its pending feedback processed in one statement
///
/// Returns the number of feedback nodes marked processed.
pub async fn apply_rule_refinement(
    graph: &Graph,
    rule_id: &str,
    cnl_rule: &str,
    prolog_rule: &str,
) -> Result<usize> {
    let cypher = query(
        "MATCH (r:OntologyRule {id: $rule_id})
         SET r.cnl_rule = $cnl_rule, r.prolog_rule = $prolog_rule
         WITH r
         OPTIONAL MATCH (f:Feedback {status: 'pending'})-[:RELATES_TO]->(r)
         SET f.status = 'processed'
         RETURN count(f) AS processed",
    )
    .param("rule_id", rule_id.to_string())
    .param("cnl_rule", cnl_rule.to_string())
    .param("prolog_rule", prolog_rule.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to apply rule refinement", e))?;

    match result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read refinement result", e))?
    {
        Some(row) => {
            let processed: i64 = row.get("processed").unwrap_or_default();
            Ok(processed.max(0) as usize)
        }
        None => Err(GraphError::not_found("OntologyRule", rule_id)),
    }
}

/// Attach feedback to a session, and to its puzzle when one is named
pub async fn submit_session_feedback(
    graph: &Graph,
    session_id: &str,
    feedback: &SessionFeedback,
) -> Result<()> {
    let cypher = query(
        "MERGE (s:Session {id: $session_id})
         CREATE (f:Feedback {
             id: $id,
             comment: $comment,
             rating: CASE WHEN $has_rating THEN $rating ELSE null END,
             correction: CASE WHEN $correction = '' THEN null ELSE $correction END,
             task_name: CASE WHEN $task_name = '' THEN null ELSE $task_name END,
             created_at: $created_at
         })
         CREATE (s)-[:HAS_FEEDBACK]->(f)
         FOREACH (_ IN CASE WHEN f.task_name IS NULL THEN [] ELSE [1] END |
             MERGE (t:Task {name: f.task_name})
             CREATE (t)-[:RECEIVED_FEEDBACK]->(f)
         )",
    )
    .param("session_id", session_id.to_string())
    .param("id", feedback.id.clone())
    .param("comment", feedback.comment.clone())
    .param("has_rating", feedback.rating.is_some())
    .param("rating", feedback.rating.unwrap_or_default())
    .param("correction", feedback.correction.clone().unwrap_or_default())
    .param("task_name", feedback.task_name.clone().unwrap_or_default())
    .param("created_at", feedback.created_at.to_rfc3339());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to submit session feedback", e))?;

    Ok(())
}

/// All feedback of a session, oldest first
pub async fn session_feedback(graph: &Graph, session_id: &str) -> Result<Vec<SessionFeedback>> {
    let cypher = query(
        "MATCH (s:Session {id: $session_id})-[:HAS_FEEDBACK]->(f:Feedback)
         RETURN f.id AS id, f.comment AS comment, f.rating AS rating,
                f.correction AS correction, f.task_name AS task_name,
                f.created_at AS created_at
         ORDER BY f.created_at",
    )
    .param("session_id", session_id.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch session feedback", e))?;

    let mut entries = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read session feedback row", e))?
    {
        let correction: String = row.get("correction").unwrap_or_default();
        let task_name: String = row.get("task_name").unwrap_or_default();
        let created_at_str: String = row.get("created_at").unwrap_or_default();

        entries.push(SessionFeedback {
            id: row.get("id").unwrap_or_default(),
            task_name: Some(task_name).filter(|t| !t.is_empty()),
            rating: row.get::<i64>("rating").ok(),
            comment: row.get("comment").unwrap_or_default(),
            correction: Some(correction).filter(|c| !c.is_empty()),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        });
    }

    Ok(entries)
}

/// Corrections users attached to a puzzle's feedback
pub async fn task_corrections(graph: &Graph, task_name: &str) -> Result<Vec<String>> {
    let cypher = query(
        "MATCH (t:Task {name: $name})-[:RECEIVED_FEEDBACK]->(f:Feedback)
         WHERE f.correction IS NOT NULL
         RETURN f.correction AS correction
         ORDER BY f.created_at",
    )
    .param("name", task_name.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch task corrections", e))?;

    let mut corrections = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read correction row", e))?
    {
        let correction: String = row.get("correction").unwrap_or_default();
        if !correction.is_empty() {
            corrections.push(correction);
        }
    }

    Ok(corrections)
}

/// Mark every `:Rule` whose definition contains `correction` as causally validated
///
/// Returns the number of rules updated.
pub async fn mark_rules_validated_by(graph: &Graph, correction: &str) -> Result<usize> {
    let cypher = query(
        "MATCH (r:Rule)
         WHERE r.definition CONTAINS $correction
         SET r.causal_validation = true
         RETURN count(r) AS updated",
    )
    .param("correction", correction.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to apply correction", e))?;

    let updated = match result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read correction result", e))?
    {
        Some(row) => row.get::<i64>("updated").unwrap_or_default(),
        None => 0,
    };

    Ok(updated.max(0) as usize)
}
