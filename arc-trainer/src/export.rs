//! Ontology export to CSV, JSON, GraphML and Cypher

use anyhow::{Context, Result};
use arc_trainer_kg::schema::ontology::is_valid_relationship_type;
use arc_trainer_kg::{Domain, KnowledgeStore, OntologyEdge};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No ontology relationships found for domain {0}")]
    NoData(Domain),

    #[error("Unknown export format: {0} (expected csv, json, graphml or cypher)")]
    UnknownFormat(String),

    #[error("Relationship type {0} cannot be written as Cypher")]
    InvalidRelationship(String),

    #[error("GraphML serialisation failed: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for ExportError {
    fn from(e: quick_xml::Error) -> Self {
        ExportError::Xml(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Graphml,
    Cypher,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Graphml => "graphml",
            ExportFormat::Cypher => "cypher",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "graphml" => Ok(ExportFormat::Graphml),
            "cypher" | "neo4j" => Ok(ExportFormat::Cypher),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Writes a domain's rule relationships to `<export_dir>/<domain>_ontology.<ext>`
pub struct Exporter {
    store: Arc<dyn KnowledgeStore>,
    export_dir: PathBuf,
}

impl Exporter {
    pub fn new(store: Arc<dyn KnowledgeStore>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            export_dir: export_dir.into(),
        }
    }

    pub fn output_path(&self, domain: Domain, format: ExportFormat) -> PathBuf {
        self.export_dir
            .join(format!("{}_ontology.{}", domain, format.extension()))
    }

    pub async fn export(&self, domain: Domain, format: ExportFormat) -> Result<PathBuf> {
        let edges = self
            .store
            .fetch_domain_relationships(domain)
            .await
            .with_context(|| format!("Failed to fetch relationships for domain {}", domain))?;
        if edges.is_empty() {
            return Err(ExportError::NoData(domain).into());
        }

        let contents = match format {
            ExportFormat::Csv => to_csv(&edges),
            ExportFormat::Json => to_json(&edges)?,
            ExportFormat::Graphml => to_graphml(&edges)?,
            ExportFormat::Cypher => to_cypher(&edges)?,
        };

        let path = self.output_path(domain, format);
        write_file(&self.export_dir, &path, &contents)?;
        tracing::info!(
            "Exported {} relationships for domain {} to {}",
            edges.len(),
            domain,
            path.display()
        );
        Ok(path)
    }
}

fn write_file(dir: &Path, path: &Path, contents: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_csv(edges: &[OntologyEdge]) -> String {
    let mut out = String::from("source,target,relationship\n");
    for edge in edges {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&edge.source),
            csv_field(&edge.target),
            csv_field(&edge.relationship)
        ));
    }
    out
}

pub fn to_json(edges: &[OntologyEdge]) -> Result<String> {
    serde_json::to_string_pretty(edges).context("Failed to serialise relationships")
}

/// Rule graph with one node per rule id, in order of first appearance
pub fn ontology_graph(edges: &[OntologyEdge]) -> DiGraph<String, String> {
    let mut graph = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();

    let mut node = |graph: &mut DiGraph<String, String>, id: &str| -> NodeIndex {
        *indices
            .entry(id.to_string())
            .or_insert_with(|| graph.add_node(id.to_string()))
    };

    for edge in edges {
        let source = node(&mut graph, &edge.source);
        let target = node(&mut graph, &edge.target);
        graph.add_edge(source, target, edge.relationship.clone());
    }
    graph
}

pub fn to_graphml(edges: &[OntologyEdge]) -> Result<String, ExportError> {
    let graph = ontology_graph(edges);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("graphml");
    root.push_attribute(("xmlns", GRAPHML_NS));
    writer.write_event(Event::Start(root))?;

    let mut key = BytesStart::new("key");
    key.push_attribute(("id", "d0"));
    key.push_attribute(("for", "edge"));
    key.push_attribute(("attr.name", "relationship"));
    key.push_attribute(("attr.type", "string"));
    writer.write_event(Event::Empty(key))?;

    let mut graph_el = BytesStart::new("graph");
    graph_el.push_attribute(("id", "G"));
    graph_el.push_attribute(("edgedefault", "directed"));
    writer.write_event(Event::Start(graph_el))?;

    for idx in graph.node_indices() {
        let mut node = BytesStart::new("node");
        node.push_attribute(("id", graph[idx].as_str()));
        writer.write_event(Event::Empty(node))?;
    }

    for edge in graph.edge_references() {
        let mut el = BytesStart::new("edge");
        el.push_attribute(("source", graph[edge.source()].as_str()));
        el.push_attribute(("target", graph[edge.target()].as_str()));
        writer.write_event(Event::Start(el))?;

        let mut data = BytesStart::new("data");
        data.push_attribute(("key", "d0"));
        writer.write_event(Event::Start(data))?;
        writer.write_event(Event::Text(BytesText::new(edge.weight())))?;
        writer.write_event(Event::End(BytesEnd::new("data")))?;

        writer.write_event(Event::End(BytesEnd::new("edge")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("graph")))?;
    writer.write_event(Event::End(BytesEnd::new("graphml")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| ExportError::Xml(e.to_string()))
}

fn cypher_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// `MERGE` statements that recreate the rules and their relationships
pub fn to_cypher(edges: &[OntologyEdge]) -> Result<String, ExportError> {
    let graph = ontology_graph(edges);
    let mut out = String::new();

    for idx in graph.node_indices() {
        out.push_str(&format!(
            "MERGE (:OntologyRule {{id: {}}});\n",
            cypher_string(&graph[idx])
        ));
    }
    for edge in graph.edge_references() {
        let rel = edge.weight();
        if !is_valid_relationship_type(rel) {
            return Err(ExportError::InvalidRelationship(rel.clone()));
        }
        out.push_str(&format!(
            "MATCH (a:OntologyRule {{id: {}}}), (b:OntologyRule {{id: {}}}) MERGE (a)-[:`{}`]->(b);\n",
            cypher_string(&graph[edge.source()]),
            cypher_string(&graph[edge.target()]),
            rel
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, rel: &str) -> OntologyEdge {
        OntologyEdge {
            source: source.to_string(),
            target: target.to_string(),
            relationship: rel.to_string(),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("neo4j".parse::<ExportFormat>().unwrap(), ExportFormat::Cypher);
        assert!(matches!(
            "yaml".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_csv_quotes_awkward_fields() {
        let csv = to_csv(&[edge("r1", "r,2", "DEPENDS_ON"), edge("say \"hi\"", "r3", "IMPLIES")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "source,target,relationship");
        assert_eq!(lines[1], "r1,\"r,2\",DEPENDS_ON");
        assert_eq!(lines[2], "\"say \"\"hi\"\"\",r3,IMPLIES");
    }

    #[test]
    fn test_graph_shares_nodes() {
        let graph = ontology_graph(&[edge("a", "b", "IMPLIES"), edge("b", "c", "IMPLIES"), edge("a", "c", "CONFLICTS_WITH")]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_graphml_layout() {
        let xml = to_graphml(&[edge("a", "b&c", "IMPLIES")]).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">"));
        assert!(xml.contains("<key id=\"d0\" for=\"edge\" attr.name=\"relationship\" attr.type=\"string\"/>"));
        assert!(xml.contains("<node id=\"a\"/>"));
        assert!(xml.contains("<node id=\"b&amp;c\"/>"));
        assert!(xml.contains("<edge source=\"a\" target=\"b&amp;c\">"));
        assert!(xml.contains("<data key=\"d0\">IMPLIES</data>"));
        assert!(xml.trim_end().ends_with("</graphml>"));
    }

    #[test]
    fn test_cypher_escapes_ids() {
        let cypher = to_cypher(&[edge("it's", "b\\c", "IMPLIES")]).unwrap();
        assert!(cypher.contains("MERGE (:OntologyRule {id: 'it\\'s'});"));
        assert!(cypher.contains("MERGE (:OntologyRule {id: 'b\\\\c'});"));
        assert!(cypher.contains("MERGE (a)-[:`IMPLIES`]->(b);"));
    }

    #[test]
    fn test_cypher_rejects_bad_relationship() {
        let err = to_cypher(&[edge("a", "b", "implies`) DETACH DELETE (a")]).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRelationship(_)));
    }
}
