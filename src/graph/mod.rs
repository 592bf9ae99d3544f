//! Property graph data model and the adjacency contract consumed by the
//! traversal engine.
//!
//! The engine treats the store as opaque: anything that can answer
//! `get_node` and `neighbors` can back a traversal. The SQLite store is the
//! production adapter; [`MemoryGraph`] backs unit tests and demos.

mod memory;
pub mod seed;
mod store;

pub use memory::MemoryGraph;
pub use seed::{load_seed, SeedStats};
pub use store::SqliteGraphStore;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A graph node: stable identity, taxonomy type tag, optional sub-type,
/// opaque properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    /// Display name, when the properties carry one.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(|v| v.as_str())
    }
}

/// A stored directed edge. The stored direction is how the arrow exists in
/// the graph, not necessarily the semantic direction of the relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEdge {
    pub source_id: String,
    pub edge_name: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl StoredEdge {
    /// Stable identity used for output deduplication.
    pub fn identity(&self) -> String {
        format!("{}|{}|{}", self.source_id, self.edge_name, self.target_id)
    }
}

/// Stored orientation of an incident edge relative to the queried node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

impl EdgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeDirection::Outgoing => "outgoing",
            EdgeDirection::Incoming => "incoming",
        }
    }
}

/// One incident edge plus its far endpoint, as returned by a store.
#[derive(Debug, Clone)]
pub struct IncidentEdge {
    pub edge: StoredEdge,
    pub direction: EdgeDirection,
    pub neighbor: Node,
}

/// Minimal adjacency contract the traversal engine depends on.
pub trait GraphStore {
    /// Fetch a node by id. Ok(None) when absent.
    fn get_node(&self, node_id: &str) -> Result<Option<Node>>;

    /// All edges incident to a node, in both stored directions.
    ///
    /// Implementations should return a stable order for a given graph so
    /// repeated identical traversals yield identical results.
    fn neighbors(&self, node_id: &str) -> Result<Vec<IncidentEdge>>;
}
