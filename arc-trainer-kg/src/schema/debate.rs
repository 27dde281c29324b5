//! Debate log operations

use crate::error::{GraphError, Result};
use crate::schema::types::DebateEntry;
use neo4rs::{query, Graph};

/// Append a debate line to a puzzle, creating the puzzle node if needed
pub async fn store_debate_message(
    graph: &Graph,
    task_name: &str,
    text: &str,
    timestamp: i64,
) -> Result<()> {
    let cypher = query(
        "MERGE (t:Task {name: $task_name})
         CREATE (d:DebateLog {id: $id, text: $text, timestamp: $timestamp})
         CREATE (t)-[:HAS_DEBATE]->(d)",
    )
    .param("task_name", task_name.to_string())
    .param("id", uuid::Uuid::new_v4().to_string())
    .param("text", text.to_string())
    .param("timestamp", timestamp);

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to store debate message", e))?;

    Ok(())
}

/// Debate lines ordered by timestamp, optionally for a single puzzle
pub async fn fetch_debate_history(
    graph: &Graph,
    task_name: Option<&str>,
) -> Result<Vec<DebateEntry>> {
    let cypher = match task_name {
        Some(name) => query(
            "MATCH (t:Task {name: $task_name})-[:HAS_DEBATE]->(d:DebateLog)
             RETURN t.name AS task_name, d.text AS text, d.timestamp AS timestamp
             ORDER BY d.timestamp",
        )
        .param("task_name", name.to_string()),
        None => query(
            "MATCH (t:Task)-[:HAS_DEBATE]->(d:DebateLog)
             RETURN t.name AS task_name, d.text AS text, d.timestamp AS timestamp
             ORDER BY d.timestamp",
        ),
    };

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch debate history", e))?;

    let mut entries = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read debate row", e))?
    {
        entries.push(DebateEntry {
            task_name: row.get("task_name").unwrap_or_default(),
            text: row.get("text").unwrap_or_default(),
            timestamp: row.get("timestamp").unwrap_or_default(),
        });
    }

    Ok(entries)
}
