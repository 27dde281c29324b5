//! Reasoning challenge nodes generated from image captions

use crate::error::{GraphError, Result};
use crate::schema::types::ReasoningChallenge;
use neo4rs::{query, Graph};

/// Store a challenge and return it with its generated id
pub async fn store_reasoning_challenge(
    graph: &Graph,
    caption: &str,
    prompt: &str,
) -> Result<ReasoningChallenge> {
    let challenge = ReasoningChallenge {
        id: uuid::Uuid::new_v4().to_string(),
        caption: caption.to_string(),
        prompt: prompt.to_string(),
    };

    let cypher = query(
        "CREATE (c:ReasoningChallenge {
            id: $id,
            caption: $caption,
            prompt: $prompt,
            created_at: $created_at
        })",
    )
    .param("id", challenge.id.clone())
    .param("caption", challenge.caption.clone())
    .param("prompt", challenge.prompt.clone())
    .param("created_at", chrono::Utc::now().to_rfc3339());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to store reasoning challenge", e))?;

    tracing::info!("Stored reasoning challenge {}", challenge.id);
    Ok(challenge)
}
