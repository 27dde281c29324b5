//! Puzzle task and attempt operations
//!
//! A `:Task` node is keyed by puzzle name and carries the latest attempt's
//! outcome. Every attempt is also kept as its own `:Attempt` node so that
//! conflicting proposals stay visible.

use crate::error::{GraphError, Result};
use crate::schema::types::AttemptRecord;
use neo4rs::{query, Graph};

/// Record one solve attempt and update the puzzle's latest outcome
pub async fn record_attempt(graph: &Graph, attempt: &AttemptRecord) -> Result<()> {
    let cypher = query(
        "MERGE (t:Task {name: $task_name})
         ON CREATE SET t.attempts = 0
         SET t.llm_text = $llm_text,
             t.success = $success,
             t.solution = CASE WHEN $proposed = '' THEN t.solution ELSE $proposed END,
             t.attempts = coalesce(t.attempts, 0) + 1,
             t.updated_at = $created_at
         CREATE (a:Attempt {
             id: $id,
             task_name: $task_name,
             prompt: $prompt,
             llm_text: $llm_text,
             proposed: CASE WHEN $proposed = '' THEN null ELSE $proposed END,
             success: $success,
             created_at: $created_at
         })
         CREATE (a)-[:ATTEMPT_OF]->(t)",
    )
    .param("id", attempt.id.clone())
    .param("task_name", attempt.task_name.clone())
    .param("prompt", attempt.prompt.clone())
    .param("llm_text", attempt.llm_text.clone())
    .param("proposed", attempt.proposed.clone().unwrap_or_default())
    .param("success", attempt.success)
    .param("created_at", attempt.created_at.to_rfc3339());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to record attempt", e))?;

    Ok(())
}

/// Latest stored solution (JSON grid text) for a puzzle
pub async fn query_solution(graph: &Graph, task_name: &str) -> Result<Option<String>> {
    let cypher = query("MATCH (t:Task {name: $name}) RETURN t.solution AS solution")
        .param("name", task_name.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to query solution", e))?;

    match result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read solution", e))?
    {
        Some(row) => {
            let solution: String = row.get("solution").unwrap_or_default();
            Ok(Some(solution).filter(|s| !s.is_empty()))
        }
        None => Ok(None),
    }
}

/// Distinct non-null grids proposed across all attempts of a puzzle
pub async fn proposed_solutions(graph: &Graph, task_name: &str) -> Result<Vec<String>> {
    let cypher = query(
        "MATCH (a:Attempt)-[:ATTEMPT_OF]->(t:Task {name: $name})
         WHERE a.proposed IS NOT NULL
         RETURN DISTINCT a.proposed AS proposed
         ORDER BY proposed",
    )
    .param("name", task_name.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to query proposals", e))?;

    let mut proposals = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read proposal row", e))?
    {
        let proposed: String = row
            .get("proposed")
            .map_err(|e| GraphError::query("Failed to extract proposal", e))?;
        proposals.push(proposed);
    }

    Ok(proposals)
}

/// All attempts for a puzzle, oldest first
pub async fn list_attempts(graph: &Graph, task_name: &str) -> Result<Vec<AttemptRecord>> {
    let cypher = query(
        "MATCH (a:Attempt)-[:ATTEMPT_OF]->(t:Task {name: $name})
         RETURN a.id AS id, a.prompt AS prompt, a.llm_text AS llm_text,
                a.proposed AS proposed, a.success AS success, a.created_at AS created_at
         ORDER BY a.created_at",
    )
    .param("name", task_name.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to list attempts", e))?;

    let mut attempts = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read attempt row", e))?
    {
        let id: String = row
            .get("id")
            .map_err(|e| GraphError::query("Failed to extract attempt id", e))?;
        let proposed: String = row.get("proposed").unwrap_or_default();
        let created_at_str: String = row.get("created_at").unwrap_or_default();

        attempts.push(AttemptRecord {
            id,
            task_name: task_name.to_string(),
            prompt: row.get("prompt").unwrap_or_default(),
            llm_text: row.get("llm_text").unwrap_or_default(),
            proposed: Some(proposed).filter(|p| !p.is_empty()),
            success: row.get("success").unwrap_or(false),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        });
    }

    Ok(attempts)
}
