//! Seed fixture loader: upserts a YAML-described graph into SQLite.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{LineageError, Result};

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    nodes: Vec<SeedNode>,
    #[serde(default)]
    edges: Vec<SeedEdge>,
}

#[derive(Debug, Deserialize)]
struct SeedNode {
    id: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sub_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SeedEdge {
    source: String,
    name: String,
    target: String,
    #[serde(default)]
    sub_type: Option<String>,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

/// Counts reported after a seed load.
#[derive(Debug, Clone, Copy)]
pub struct SeedStats {
    pub nodes: usize,
    pub edges: usize,
}

/// Load a seed fixture file into the graph tables.
///
/// Existing rows with the same identity are replaced, so reloading a fixture
/// is idempotent.
pub fn load_seed(conn: &mut Connection, path: &Path) -> Result<SeedStats> {
    let content = std::fs::read_to_string(path).map_err(LineageError::Io)?;
    load_seed_str(conn, &content)
}

/// Load a seed fixture from YAML content.
pub fn load_seed_str(conn: &mut Connection, content: &str) -> Result<SeedStats> {
    let seed: SeedFile = serde_yaml_ng::from_str(content)
        .map_err(|e| LineageError::Config(format!("Seed YAML parse error: {}", e)))?;

    let tx = conn.transaction()?;

    for node in &seed.nodes {
        let mut properties = node.properties.clone();
        if let Some(name) = &node.name {
            properties.insert("name".to_string(), serde_json::Value::String(name.clone()));
        }
        if let Some(description) = &node.description {
            properties.insert(
                "description".to_string(),
                serde_json::Value::String(description.clone()),
            );
        }
        let properties_json = serde_json::to_string(&properties)
            .map_err(|e| LineageError::Config(format!("node {} properties: {}", node.id, e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO nodes (node_id, node_type, sub_type, properties_json) \
             VALUES (?1, ?2, ?3, ?4)",
            params![node.id, node.node_type, node.sub_type, properties_json],
        )?;
    }

    for edge in &seed.edges {
        let properties_json = if edge.properties.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&edge.properties).map_err(|e| {
                LineageError::Config(format!(
                    "edge {} -> {} properties: {}",
                    edge.source, edge.target, e
                ))
            })?)
        };

        // INSERT OR REPLACE rides the unique (source, name, target) index,
        // so reloads do not duplicate edges.
        tx.execute(
            "INSERT OR REPLACE INTO edges \
             (edge_id, source_id, edge_name, target_id, sub_type, properties_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                edge.source,
                edge.name,
                edge.target,
                edge.sub_type,
                properties_json
            ],
        )?;
    }

    tx.commit()?;

    Ok(SeedStats {
        nodes: seed.nodes.len(),
        edges: seed.edges.len(),
    })
}
