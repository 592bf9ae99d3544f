//! One-hop neighborhood query: immediate neighbors of a node, grouped by
//! axis and semantic direction. No path state is involved, so this bypasses
//! the BFS engine and classifies incident edges directly.

use serde::{Deserialize, Serialize};

use crate::config::TraversalConfig;
use crate::error::{LineageError, Result};
use crate::graph::{EdgeDirection, GraphStore};
use crate::taxonomy::{Axis, FlowDirection, SemanticUp, TaxonomyRegistry};
use super::{NodeSummary, StartNodeSummary, TraverseRequest};

/// Wire-level one-hop request.
#[derive(Debug, Clone, Deserialize)]
pub struct OneHopRequest {
    pub start_node_id: String,
    #[serde(default)]
    pub axes: Option<Vec<String>>,
}

impl OneHopRequest {
    /// Reuse the traversal validation for the shared fields.
    pub fn validate(&self, limits: &TraversalConfig) -> Result<super::TraversalParams> {
        TraverseRequest {
            start_node_id: self.start_node_id.clone(),
            axes: self.axes.clone(),
            x_direction: None,
            y_direction: None,
            max_z_hops: None,
            max_depth: None,
            include_transformers: true,
        }
        .validate(limits)
    }
}

/// One immediate neighbor with the edge that reaches it.
#[derive(Debug, Clone, Serialize)]
pub struct OneHopNeighbor {
    pub node: NodeSummary,
    pub edge_name: String,
    /// Stored orientation relative to the start node.
    pub direction: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct XNeighbors {
    pub upstream: Vec<OneHopNeighbor>,
    pub downstream: Vec<OneHopNeighbor>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct YNeighbors {
    pub up: Vec<OneHopNeighbor>,
    pub down: Vec<OneHopNeighbor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OneHopMetadata {
    pub total_x_upstream: usize,
    pub total_x_downstream: usize,
    pub total_y_up: usize,
    pub total_y_down: usize,
    pub total_z: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OneHopResponse {
    pub start_node: StartNodeSummary,
    pub x_axis: XNeighbors,
    pub y_axis: YNeighbors,
    pub z_axis: Vec<OneHopNeighbor>,
    pub metadata: OneHopMetadata,
}

/// Classify every incident edge of a node and bucket the neighbors.
pub fn one_hop(
    registry: &TaxonomyRegistry,
    store: &dyn GraphStore,
    params: &super::TraversalParams,
) -> Result<OneHopResponse> {
    let start = store
        .get_node(&params.start_node_id)?
        .ok_or_else(|| LineageError::StartNotFound(params.start_node_id.clone()))?;
    registry.node_role(&start.node_type)?;

    let mut x_axis = XNeighbors::default();
    let mut y_axis = YNeighbors::default();
    let mut z_axis = Vec::new();

    for incident in store.neighbors(&start.id)? {
        let outgoing = incident.direction == EdgeDirection::Outgoing;
        let (source_type, destination_type) = if outgoing {
            (start.node_type.as_str(), incident.neighbor.node_type.as_str())
        } else {
            (incident.neighbor.node_type.as_str(), start.node_type.as_str())
        };

        let classification = match registry.classify(
            &incident.edge.edge_name,
            source_type,
            destination_type,
            incident.edge.sub_type.as_deref(),
        ) {
            Some(c) => c,
            None => continue,
        };

        if !params.axes.contains(&classification.axis) {
            continue;
        }

        let neighbor = OneHopNeighbor {
            node: NodeSummary::from_node(&incident.neighbor),
            edge_name: incident.edge.edge_name.clone(),
            direction: incident.direction.as_str().to_string(),
        };

        match classification.axis {
            Axis::X => {
                let along = match classification.x_along_arrow {
                    Some(along) => along,
                    None => continue,
                };
                let sense = if outgoing { along } else { along.flip() };
                match sense {
                    FlowDirection::Upstream => x_axis.upstream.push(neighbor),
                    FlowDirection::Downstream => x_axis.downstream.push(neighbor),
                }
            }
            Axis::Y => {
                let semantic_up = match classification.semantic_up {
                    Some(up) => up,
                    None => continue,
                };
                if (semantic_up == SemanticUp::Forward) == outgoing {
                    y_axis.up.push(neighbor);
                } else {
                    y_axis.down.push(neighbor);
                }
            }
            Axis::Z => z_axis.push(neighbor),
        }
    }

    let metadata = OneHopMetadata {
        total_x_upstream: x_axis.upstream.len(),
        total_x_downstream: x_axis.downstream.len(),
        total_y_up: y_axis.up.len(),
        total_y_down: y_axis.down.len(),
        total_z: z_axis.len(),
    };

    Ok(OneHopResponse {
        start_node: StartNodeSummary::from_node(&start),
        x_axis,
        y_axis,
        z_axis,
        metadata,
    })
}
