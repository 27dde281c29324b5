//! Rule validation and trust metrics

use crate::error::{GraphError, Result};
use crate::schema::types::DashboardReport;
use neo4rs::{query, Graph};
use std::collections::BTreeMap;

/// Trust scores are agreement ratios and must lie in `[0, 1]`
pub fn check_consistency_score(score: f64) -> Result<()> {
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(GraphError::ValidationError(format!(
            "Consistency score must be within [0, 1], got {}",
            score
        )))
    }
}

/// Record whether a rule passed causal validation
pub async fn log_causal_validation(graph: &Graph, rule_id: &str, success: bool) -> Result<()> {
    let cypher = query(
        "MERGE (r:Rule {id: $rule_id})
         SET r.causal_validation = $success",
    )
    .param("rule_id", rule_id.to_string())
    .param("success", success);

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to log causal validation", e))?;

    tracing::info!(
        "Causal validation logged for rule {}: {}",
        rule_id,
        if success { "passed" } else { "failed" }
    );
    Ok(())
}

/// Record the AI-to-AI agreement score for a query
pub async fn log_ai_trust_verification(graph: &Graph, query_text: &str, score: f64) -> Result<()> {
    check_consistency_score(score)?;

    let cypher = query(
        "MERGE (t:TrustCheck {query: $query})
         SET t.consistency_score = $score",
    )
    .param("query", query_text.to_string())
    .param("score", score);

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to log trust verification", e))?;

    Ok(())
}

/// Add `failure_count` to a rule's counterfactual failure tally
pub async fn log_counterfactual_failures(
    graph: &Graph,
    rule_id: &str,
    failure_count: u32,
) -> Result<()> {
    let cypher = query(
        "MERGE (r:Rule {id: $rule_id})
         SET r.counterfactual_failures = coalesce(r.counterfactual_failures, 0) + $failure_count",
    )
    .param("rule_id", rule_id.to_string())
    .param("failure_count", i64::from(failure_count));

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to log counterfactual failures", e))?;

    Ok(())
}

pub async fn get_causal_validation_metrics(graph: &Graph) -> Result<BTreeMap<String, bool>> {
    let cypher = query(
        "MATCH (r:Rule) WHERE r.causal_validation IS NOT NULL
         RETURN r.id AS rule_id, r.causal_validation AS validation",
    );

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch causal validation metrics", e))?;

    let mut metrics = BTreeMap::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read metric row", e))?
    {
        let rule_id: String = row.get("rule_id").unwrap_or_default();
        metrics.insert(rule_id, row.get("validation").unwrap_or(false));
    }

    Ok(metrics)
}

pub async fn get_ai_trust_metrics(graph: &Graph) -> Result<BTreeMap<String, f64>> {
    let cypher = query("MATCH (t:TrustCheck) RETURN t.query AS query, t.consistency_score AS score");

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch trust metrics", e))?;

    let mut metrics = BTreeMap::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read metric row", e))?
    {
        let query_text: String = row.get("query").unwrap_or_default();
        metrics.insert(query_text, row.get("score").unwrap_or_default());
    }

    Ok(metrics)
}

pub async fn get_counterfactual_failure_metrics(graph: &Graph) -> Result<BTreeMap<String, i64>> {
    let cypher = query(
        "MATCH (r:Rule) WHERE r.counterfactual_failures IS NOT NULL
         RETURN r.id AS rule_id, r.counterfactual_failures AS failures",
    );

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch counterfactual metrics", e))?;

    let mut metrics = BTreeMap::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read metric row", e))?
    {
        let rule_id: String = row.get("rule_id").unwrap_or_default();
        metrics.insert(rule_id, row.get("failures").unwrap_or_default());
    }

    Ok(metrics)
}

/// All three metric families in one report
pub async fn dashboard_report(graph: &Graph) -> Result<DashboardReport> {
    Ok(DashboardReport {
        causal_validation: get_causal_validation_metrics(graph).await?,
        ai_trust_verification: get_ai_trust_metrics(graph).await?,
        counterfactual_failures: get_counterfactual_failure_metrics(graph).await?,
    })
}
