//! Traversal surface: request validation, the BFS engine, hop collapsing,
//! and the one-hop neighborhood query.

mod collapse;
mod engine;
mod one_hop;

#[cfg(test)]
pub(crate) mod fixtures;

pub use collapse::HopCollapser;
pub use engine::{CancelFlag, RawPath, RawStep, RawTraversal, TraversalEngine};
pub use one_hop::{one_hop, OneHopRequest, OneHopResponse};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::TraversalConfig;
use crate::error::{LineageError, Result};
use crate::graph::Node;
use crate::taxonomy::Axis;

/// Wire-level traversal request, as posted to the HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TraverseRequest {
    pub start_node_id: String,
    #[serde(default)]
    pub axes: Option<Vec<String>>,
    #[serde(default)]
    pub x_direction: Option<String>,
    #[serde(default)]
    pub y_direction: Option<String>,
    #[serde(default)]
    pub max_z_hops: Option<i64>,
    #[serde(default)]
    pub max_depth: Option<i64>,
    #[serde(default = "default_include_transformers")]
    pub include_transformers: bool,
}

fn default_include_transformers() -> bool {
    true
}

/// X-axis direction filter relative to the start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XDirectionFilter {
    Upstream,
    Downstream,
    Both,
}

/// Y-axis direction filter in semantic up/down terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YDirectionFilter {
    Up,
    Down,
    Both,
}

/// Validated traversal parameters the engine executes.
#[derive(Debug, Clone)]
pub struct TraversalParams {
    pub start_node_id: String,
    pub axes: BTreeSet<Axis>,
    pub x_direction: XDirectionFilter,
    pub y_direction: YDirectionFilter,
    pub max_z_hops: u32,
    pub max_depth: Option<u32>,
    pub include_transformers: bool,
}

impl TraverseRequest {
    /// Validate against the configured limits. All malformed-field cases
    /// surface here, before any traversal work.
    pub fn validate(&self, limits: &TraversalConfig) -> Result<TraversalParams> {
        if self.start_node_id.trim().is_empty() {
            return Err(LineageError::InvalidRequest(
                "start_node_id must not be empty".to_string(),
            ));
        }

        let axis_codes = self
            .axes
            .clone()
            .unwrap_or_else(|| vec!["x".into(), "y".into(), "z".into()]);
        if axis_codes.is_empty() {
            return Err(LineageError::InvalidRequest(
                "axes must not be empty".to_string(),
            ));
        }
        let mut axes = BTreeSet::new();
        for code in &axis_codes {
            let axis = Axis::parse(code).ok_or_else(|| {
                LineageError::InvalidRequest(format!("unknown axis code: {}", code))
            })?;
            axes.insert(axis);
        }

        let x_direction = match self.x_direction.as_deref().unwrap_or("both") {
            "upstream" => XDirectionFilter::Upstream,
            "downstream" => XDirectionFilter::Downstream,
            "both" => XDirectionFilter::Both,
            other => {
                return Err(LineageError::InvalidRequest(format!(
                    "x_direction must be upstream, downstream or both, got '{}'",
                    other
                )))
            }
        };
        let y_direction = match self.y_direction.as_deref().unwrap_or("both") {
            "up" => YDirectionFilter::Up,
            "down" => YDirectionFilter::Down,
            "both" => YDirectionFilter::Both,
            other => {
                return Err(LineageError::InvalidRequest(format!(
                    "y_direction must be up, down or both, got '{}'",
                    other
                )))
            }
        };

        let max_z_hops = match self.max_z_hops {
            None => limits.default_max_z_hops,
            Some(n) if n < 0 => {
                return Err(LineageError::InvalidRequest(
                    "max_z_hops must be non-negative".to_string(),
                ))
            }
            Some(n) if n as u64 > limits.max_z_hops_cap as u64 => {
                return Err(LineageError::InvalidRequest(format!(
                    "max_z_hops {} exceeds the system cap of {}",
                    n, limits.max_z_hops_cap
                )))
            }
            Some(n) => n as u32,
        };

        let max_depth = match self.max_depth {
            None => None,
            Some(n) if n < 0 => {
                return Err(LineageError::InvalidRequest(
                    "max_depth must be non-negative".to_string(),
                ))
            }
            Some(n) => Some(n.min(u32::MAX as i64) as u32),
        };

        Ok(TraversalParams {
            start_node_id: self.start_node_id.clone(),
            axes,
            x_direction,
            y_direction,
            max_z_hops,
            max_depth,
            include_transformers: self.include_transformers,
        })
    }
}

/// Start node summary in responses.
#[derive(Debug, Clone, Serialize)]
pub struct StartNodeSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StartNodeSummary {
    pub fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            name: node.name().map(String::from),
        }
    }
}

/// Node summary in the deduplicated response node list.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl NodeSummary {
    pub fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            sub_type: node.sub_type.clone(),
            properties: node.properties.clone(),
        }
    }
}

/// Lightweight node reference used inside logical steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

impl NodeRef {
    pub fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
        }
    }
}

/// Edge summary in the deduplicated response edge list.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSummary {
    pub source: String,
    pub name: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// A single entry in an output path.
///
/// X steps span two stored edges via a transformer; Y and Z steps span one.
/// An unclosed X step (half-hop at the end of a path) has `to = null`.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalStep {
    pub axis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub from: Option<NodeRef>,
    pub to: Option<NodeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<NodeRef>,
    pub edge_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hop_group: Option<String>,
}

/// One path from the start node, as a list of logical steps.
#[derive(Debug, Clone, Serialize)]
pub struct PathRecord {
    pub logical_steps: Vec<LogicalStep>,
    pub z_hops: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraversalMetadata {
    pub z_hops_taken: u32,
    pub total_nodes_visited: usize,
    pub blocked_z_of_z_paths: u64,
}

/// Full traversal response after collapsing.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalResponse {
    pub start_node: StartNodeSummary,
    pub nodes: Vec<NodeSummary>,
    pub edges: Vec<EdgeSummary>,
    pub paths: Vec<PathRecord>,
    pub traversal_metadata: TraversalMetadata,
}
