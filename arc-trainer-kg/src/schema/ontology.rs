//! Ontology rule operations
//!
//! `:OntologyRule` nodes hold a CNL statement and its Prolog translation for
//! one [`Domain`]. `:Rule` nodes hold Prolog definitions that passed
//! validation, plus the metrics logged against them.

use crate::error::{GraphError, Result};
use crate::schema::types::{Domain, OntologyEdge, OntologyRule};
use neo4rs::{query, Graph};

/// Relationship types are spliced into Cypher, so only `[A-Z][A-Z0-9_]*` is accepted
pub fn is_valid_relationship_type(rel: &str) -> bool {
    let mut chars = rel.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Create or update an ontology rule keyed by id
pub async fn upsert_ontology_rule(graph: &Graph, rule: &OntologyRule) -> Result<()> {
    let cypher = query(
        "MERGE (r:OntologyRule {id: $id})
         SET r.cnl_rule = $cnl_rule,
             r.prolog_rule = $prolog_rule,
             r.domain = $domain",
    )
    .param("id", rule.id.clone())
    .param("cnl_rule", rule.cnl_rule.clone())
    .param("prolog_rule", rule.prolog_rule.clone())
    .param("domain", rule.domain.as_str());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to upsert ontology rule", e))?;

    Ok(())
}

/// Fetch an ontology rule by id
pub async fn get_ontology_rule(graph: &Graph, rule_id: &str) -> Result<Option<OntologyRule>> {
    let cypher = query(
        "MATCH (r:OntologyRule {id: $id})
         RETURN r.id AS id, r.cnl_rule AS cnl_rule, r.prolog_rule AS prolog_rule, r.domain AS domain",
    )
    .param("id", rule_id.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to get ontology rule", e))?;

    let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read ontology rule", e))?
    else {
        return Ok(None);
    };

    let id: String = row
        .get("id")
        .map_err(|e| GraphError::query("Failed to extract rule id", e))?;
    let domain_str: String = row.get("domain").unwrap_or_default();
    // Rules written before domain validation existed fall back to `general`
    let domain = Domain::parse(&domain_str).unwrap_or_default();

    Ok(Some(OntologyRule {
        id,
        cnl_rule: row.get("cnl_rule").unwrap_or_default(),
        prolog_rule: row.get("prolog_rule").unwrap_or_default(),
        domain,
    }))
}

/// Create `(source)-[:REL]->(target)` between two existing ontology rules
///
/// # Returns
/// * `Ok(true)` if both rules exist and the relationship is in place
/// * `Ok(false)` if either rule is missing
pub async fn link_ontology_rules(
    graph: &Graph,
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

    let cypher = query(&format!(
        "MATCH (s:OntologyRule {{id: $source_id}})
         MATCH (t:OntologyRule {{id: $target_id}})
         MERGE (s)-[:{}]->(t)
         RETURN s.id AS id",
        relationship
    ))
    .param("source_id", source_id.to_string())
    .param("target_id", target_id.to_string());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to link ontology rules", e))?;

    Ok(result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read link result", e))?
        .is_some())
}

/// Relationships whose two ends both belong to `domain`
pub async fn fetch_domain_relationships(graph: &Graph, domain: Domain) -> Result<Vec<OntologyEdge>> {
    let cypher = query(
        "MATCH (n:OntologyRule)-[r]->(m:OntologyRule)
         WHERE n.domain = $domain AND m.domain = $domain
         RETURN n.id AS source, m.id AS target, type(r) AS relationship
         ORDER BY source, target, relationship",
    )
    .param("domain", domain.as_str());

    let mut result = graph
        .execute(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to fetch ontology relationships", e))?;

    let mut edges = Vec::new();
    while let Some(row) = result
        .next()
        .await
        .map_err(|e| GraphError::query("Failed to read relationship row", e))?
    {
        edges.push(OntologyEdge {
            source: row.get("source").unwrap_or_default(),
            target: row.get("target").unwrap_or_default(),
            relationship: row.get("relationship").unwrap_or_default(),
        });
    }

    tracing::debug!(
        "Fetched {} ontology relationships for domain '{}'",
        edges.len(),
        domain
    );

    Ok(edges)
}

/// Store a Prolog definition that passed validation
pub async fn store_validated_rule(graph: &Graph, rule_id: &str, definition: &str) -> Result<()> {
    let cypher = query(
        "MERGE (r:Rule {id: $id})
         SET r.definition = $definition",
    )
    .param("id", rule_id.to_string())
    .param("definition", definition.to_string());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to store validated rule", e))?;

    Ok(())
}

/// Record a counterexample that failed one of the rule checks
pub async fn log_counterexample_failure(
    graph: &Graph,
    rule: &str,
    example: &str,
    reason: &str,
) -> Result<()> {
    let cypher = query(
        "MERGE (c:Counterexample {example: $example})
         SET c.failure_reason = $reason, c.rule = $rule",
    )
    .param("example", example.to_string())
    .param("reason", reason.to_string())
    .param("rule", rule.to_string());

    graph
        .run(cypher)
        .await
        .map_err(|e| GraphError::query("Failed to log counterexample", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_type_validation() {
        assert!(is_valid_relationship_type("REFINES"));
        assert!(is_valid_relationship_type("DEPENDS_ON_2"));
        assert!(!is_valid_relationship_type(""));
        assert!(!is_valid_relationship_type("refines"));
        assert!(!is_valid_relationship_type("_HIDDEN"));
        assert!(!is_valid_relationship_type("X]->(y) DETACH DELETE y //"));
    }
}
