//! Job node operations
//!
//! Jobs are UUID-keyed payloads queued for processing. They are a separate
//! label from puzzle `:Task` nodes, which are keyed by puzzle name.

use crate::error::{GraphError, Result};
use crate::schema::types::{Job, JobStatus};
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph};

/// Create a queued `:Job` node holding `data`
///
/// # Example
/// ```no_run
/// use arc_trainer_kg::{GraphClient, schema::submit_job};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = GraphClient::new("bolt://localhost:7687", "neo4j", "password", "neo4j").await?;
///     let job = submit_job(client.graph(), &serde_json::json!({"task_name": "007bbfc7"})).await?;
///     println!("queued {}", job.id);
///     Ok(())
/// }
/// ```
pub async fn submit_job(graph: &Graph, data: &serde_json::Value) -> Result<Job> {
    let job = Job::new(data.clone());
    let data_text = serde_json::to_string(&job.data)?;

    let cypher = query(
        "CREATE (j:Job {
            id: $id,
            status: $status,
            data: $data,
            created_at: $created_at
        })",
    )
    .param("id", job.id.clone())
    .param("status", job.status.as_str())
    .param("data", data_text)
    .param("created_at", job.created_at.to_rfc3339());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to submit job", e))?;

    Ok(job)
}

/// Fetch a job by id
///
/// # Returns
/// * `Ok(Some(Job))` if the job exists
/// * `Ok(None)` if not found
pub async fn get_job(graph: &Graph, job_id: &str) -> Result<Option<Job>> {
    let cypher = query(
        "MATCH (j:Job {id: $id})
         RETURN j.id AS id, j.status AS status, j.data AS data, j.created_at AS created_at",
    )
    .param("id", job_id.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to get job", e))?;

    let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read job result", e))?
    else {
        return Ok(None);
    };

    let id: String = row
        .get("id")
        .map_err(|e| GraphError::query("Failed to extract job id", e))?;
    let status_str: String = row
        .get("status")
        .map_err(|e| GraphError::query("Failed to extract job status", e))?;
    let status = JobStatus::parse(&status_str)
        .ok_or_else(|| GraphError::QueryError(format!("Invalid job status: {}", status_str)))?;
    let data_text: String = row.get("data").unwrap_or_default();
    let data = if data_text.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&data_text)?
    };
    let created_at_str: String = row.get("created_at").unwrap_or_default();
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Some(Job {
        id,
        status,
        data,
        created_at,
    }))
}

/// Set a job's status
///
/// # Returns
/// * `Ok(true)` if the job was found and updated
/// * `Ok(false)` if the job was not found
pub async fn update_job_status(graph: &Graph, job_id: &str, status: JobStatus) -> Result<bool> {
    let cypher = query(
        "MATCH (j:Job {id: $id})
         SET j.status = $status
         RETURN j.id AS id",
    )
    .param("id", job_id.to_string())
    .param("status", status.as_str());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to update job", e))?;

    let updated = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read update result", e))?
        .is_some();

    Ok(updated)
}
