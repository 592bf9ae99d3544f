//! In-memory graph store for tests and demos.

use std::collections::HashMap;

use serde_json::json;

use crate::error::Result;
use super::{EdgeDirection, GraphStore, IncidentEdge, Node, StoredEdge};

/// A simple adjacency-list graph held entirely in memory.
///
/// Edges are returned in insertion order, outgoing before incoming, which
/// keeps traversal output deterministic.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: HashMap<String, Node>,
    edges: Vec<StoredEdge>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node with a display name.
    pub fn add_node(&mut self, id: &str, node_type: &str, name: &str) {
        self.add_node_with_sub_type(id, node_type, name, None);
    }

    /// Insert a node carrying a sub-type.
    pub fn add_node_with_sub_type(
        &mut self,
        id: &str,
        node_type: &str,
        name: &str,
        sub_type: Option<&str>,
    ) {
        let mut properties = serde_json::Map::new();
        properties.insert("name".to_string(), json!(name));
        self.nodes.insert(id.to_string(), Node {
            id: id.to_string(),
            node_type: node_type.to_string(),
            sub_type: sub_type.map(String::from),
            properties,
        });
    }

    /// Insert a directed edge.
    pub fn add_edge(&mut self, source_id: &str, edge_name: &str, target_id: &str) {
        self.add_edge_with_sub_type(source_id, edge_name, target_id, None);
    }

    /// Insert a directed edge carrying a sub-type qualifier.
    pub fn add_edge_with_sub_type(
        &mut self,
        source_id: &str,
        edge_name: &str,
        target_id: &str,
        sub_type: Option<&str>,
    ) {
        self.edges.push(StoredEdge {
            source_id: source_id.to_string(),
            edge_name: edge_name.to_string(),
            target_id: target_id.to_string(),
            sub_type: sub_type.map(String::from),
            properties: serde_json::Map::new(),
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphStore for MemoryGraph {
    fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.get(node_id).cloned())
    }

    fn neighbors(&self, node_id: &str) -> Result<Vec<IncidentEdge>> {
        let mut incident = Vec::new();

        for edge in &self.edges {
            if edge.source_id == node_id {
                if let Some(neighbor) = self.nodes.get(&edge.target_id) {
                    incident.push(IncidentEdge {
                        edge: edge.clone(),
                        direction: EdgeDirection::Outgoing,
                        neighbor: neighbor.clone(),
                    });
                }
            }
        }
        for edge in &self.edges {
            if edge.target_id == node_id && edge.source_id != node_id {
                if let Some(neighbor) = self.nodes.get(&edge.source_id) {
                    incident.push(IncidentEdge {
                        edge: edge.clone(),
                        direction: EdgeDirection::Incoming,
                        neighbor: neighbor.clone(),
                    });
                }
            }
        }

        Ok(incident)
    }
}
