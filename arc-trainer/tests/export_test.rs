//! Ontology export to disk in every format

use std::sync::Arc;

use anyhow::Result;
use arc_trainer::export::{ExportError, ExportFormat, Exporter};
use arc_trainer_kg::{Domain, KnowledgeStore, MemoryStore, OntologyRule};
use tempfile::TempDir;

async fn legal_ontology() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, cnl) in [
        ("contract", "A contract needs consent."),
        ("consent", "Consent needs capacity."),
        ("minor", "Minors lack capacity, \"usually\"."),
    ] {
        store
            .upsert_ontology_rule(&OntologyRule {
                id: id.to_string(),
                cnl_rule: cnl.to_string(),
                prolog_rule: format!("{}(X).", id),
                domain: Domain::Legal,
            })
            .await
            .unwrap();
    }
    store
        .upsert_ontology_rule(&OntologyRule {
            id: "loan".to_string(),
            cnl_rule: "A loan accrues interest.".to_string(),
            prolog_rule: "loan(X).".to_string(),
            domain: Domain::Finance,
        })
        .await
        .unwrap();

    store.link_ontology_rules("contract", "consent", "DEPENDS_ON").await.unwrap();
    store.link_ontology_rules("minor", "consent", "RESTRICTS").await.unwrap();
    store.link_ontology_rules("contract", "loan", "RELATED_TO").await.unwrap();
    store
}

#[tokio::test]
async fn test_json_export_only_contains_domain_edges() -> Result<()> {
    let tmp = TempDir::new()?;
    let exporter = Exporter::new(legal_ontology().await, tmp.path().join("exports"));

    let path = exporter.export(Domain::Legal, ExportFormat::Json).await?;
    assert_eq!(path, tmp.path().join("exports").join("legal_ontology.json"));

    let edges: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let edges = edges.as_array().unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges
        .iter()
        .all(|e| e["relationship"] == "DEPENDS_ON" || e["relationship"] == "RESTRICTS"));
    Ok(())
}

#[tokio::test]
async fn test_csv_export() -> Result<()> {
    let tmp = TempDir::new()?;
    let exporter = Exporter::new(legal_ontology().await, tmp.path());

    let path = exporter.export(Domain::Legal, ExportFormat::Csv).await?;
    assert_eq!(path.file_name().unwrap(), "legal_ontology.csv");

    let csv = std::fs::read_to_string(&path)?;
    let mut lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.remove(0), "source,target,relationship");
    lines.sort();
    assert_eq!(lines, vec!["contract,consent,DEPENDS_ON", "minor,consent,RESTRICTS"]);
    Ok(())
}

#[tokio::test]
async fn test_graphml_export() -> Result<()> {
    let tmp = TempDir::new()?;
    let exporter = Exporter::new(legal_ontology().await, tmp.path());

    let path = exporter.export(Domain::Legal, ExportFormat::Graphml).await?;
    let xml = std::fs::read_to_string(&path)?;
    assert_eq!(xml.matches("<node ").count(), 3);
    assert_eq!(xml.matches("<edge ").count(), 2);
    assert!(xml.contains("<edge source=\"minor\" target=\"consent\">"));
    assert!(xml.contains("<data key=\"d0\">RESTRICTS</data>"));
    Ok(())
}

#[tokio::test]
async fn test_cypher_export() -> Result<()> {
    let tmp = TempDir::new()?;
    let exporter = Exporter::new(legal_ontology().await, tmp.path());

    let path = exporter.export(Domain::Legal, "neo4j".parse()?).await?;
    assert_eq!(path.extension().unwrap(), "cypher");

    let cypher = std::fs::read_to_string(&path)?;
    assert_eq!(cypher.matches("MERGE (:OntologyRule").count(), 3);
    assert!(cypher.contains(
        "MATCH (a:OntologyRule {id: 'contract'}), (b:OntologyRule {id: 'consent'}) MERGE (a)-[:`DEPENDS_ON`]->(b);"
    ));
    Ok(())
}

#[tokio::test]
async fn test_empty_domain_reports_no_data() {
    let tmp = TempDir::new().unwrap();
    let exporter = Exporter::new(legal_ontology().await, tmp.path().join("out"));

    let err = exporter
        .export(Domain::Healthcare, ExportFormat::Csv)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExportError>(),
        Some(ExportError::NoData(Domain::Healthcare))
    ));
    assert!(!tmp.path().join("out").exists());
}
