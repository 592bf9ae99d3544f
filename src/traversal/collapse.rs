//! Hop collapsing: reshapes the raw traversal output into the user-facing
//! response.
//!
//! Collapsing is a presentation concern. It never prunes reachable
//! material, only reshapes it: passthrough (non-visible) nodes are elided
//! with a synthesized edge between their neighbors, and paired X edges
//! sharing a hop group fold into one logical resource→resource step via the
//! transformer.

use std::collections::{HashMap, HashSet};

use crate::error::{LineageError, Result};
use crate::graph::Node;
use crate::taxonomy::{Axis, NodeRole, TaxonomyRegistry};
use super::engine::{RawStep, RawTraversal};
use super::{
    EdgeSummary, LogicalStep, NodeRef, NodeSummary, PathRecord, StartNodeSummary,
    TraversalMetadata, TraversalResponse,
};

/// Intermediate step shape after passthrough elision.
struct MergedStep {
    from_id: String,
    /// None when the path ends at a hidden node.
    to_id: Option<String>,
    axis: Axis,
    direction: String,
    edge_names: Vec<String>,
    hop_group: Option<String>,
    /// True when this step was merged across a passthrough node; such steps
    /// never participate in hop folding.
    synthesized: bool,
}

pub struct HopCollapser<'a> {
    registry: &'a TaxonomyRegistry,
}

impl<'a> HopCollapser<'a> {
    pub fn new(registry: &'a TaxonomyRegistry) -> Self {
        Self { registry }
    }

    /// Produce the response shape from a raw traversal.
    pub fn collapse(
        &self,
        raw: &RawTraversal,
        include_transformers: bool,
    ) -> Result<TraversalResponse> {
        let node_lookup: HashMap<&str, &Node> =
            raw.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        let mut synthesized_edges: Vec<EdgeSummary> = Vec::new();
        let mut synthesized_seen: HashSet<String> = HashSet::new();

        let mut paths = Vec::with_capacity(raw.paths.len());
        for raw_path in &raw.paths {
            let merged = self.elide_passthrough(
                &raw_path.steps,
                &node_lookup,
                &mut synthesized_edges,
                &mut synthesized_seen,
            )?;
            let logical_steps = self.fold_hops(&merged, &node_lookup)?;
            paths.push(PathRecord {
                logical_steps,
                z_hops: raw_path.z_hops,
            });
        }

        // Visibility filtering of the flat node/edge lists. Hidden
        // transformers stay visible inside steps as `via`.
        let mut dropped_ids: HashSet<&str> = HashSet::new();
        for node in &raw.nodes {
            let info = self.registry.node_role(&node.node_type)?;
            if !info.visible {
                dropped_ids.insert(node.id.as_str());
            } else if !include_transformers && info.role == NodeRole::Transformer {
                dropped_ids.insert(node.id.as_str());
            }
        }

        let nodes: Vec<NodeSummary> = raw
            .nodes
            .iter()
            .filter(|n| !dropped_ids.contains(n.id.as_str()))
            .map(NodeSummary::from_node)
            .collect();

        let mut edges: Vec<EdgeSummary> = raw
            .edges
            .iter()
            .filter(|e| {
                !dropped_ids.contains(e.source_id.as_str())
                    && !dropped_ids.contains(e.target_id.as_str())
            })
            .map(|e| EdgeSummary {
                source: e.source_id.clone(),
                name: e.edge_name.clone(),
                target: e.target_id.clone(),
                sub_type: e.sub_type.clone(),
                properties: e.properties.clone(),
            })
            .collect();
        edges.extend(
            synthesized_edges
                .into_iter()
                .filter(|e| {
                    !dropped_ids.contains(e.source.as_str())
                        && !dropped_ids.contains(e.target.as_str())
                }),
        );

        Ok(TraversalResponse {
            start_node: StartNodeSummary::from_node(&raw.start_node),
            nodes,
            edges,
            paths,
            traversal_metadata: TraversalMetadata {
                z_hops_taken: raw.max_z_taken,
                total_nodes_visited: raw.nodes.len(),
                blocked_z_of_z_paths: raw.blocked_z_of_z_paths,
            },
        })
    }

    /// Pass 1: elide passthrough nodes from a step list.
    ///
    /// Adjacent steps through a hidden node merge into one step between its
    /// neighbors; a direct edge between them is synthesized for the flat
    /// edge list. A path that ends at a hidden node keeps an unclosed step.
    fn elide_passthrough(
        &self,
        steps: &[RawStep],
        node_lookup: &HashMap<&str, &Node>,
        synthesized_edges: &mut Vec<EdgeSummary>,
        synthesized_seen: &mut HashSet<String>,
    ) -> Result<Vec<MergedStep>> {
        let mut merged = Vec::new();
        let mut i = 0;

        while i < steps.len() {
            let step = &steps[i];
            let to_node = self.lookup(node_lookup, &step.to_id)?;

            if !self.registry.is_passthrough(&to_node.node_type) {
                merged.push(MergedStep {
                    from_id: step.from_id.clone(),
                    to_id: Some(step.to_id.clone()),
                    axis: step.axis,
                    direction: step.direction.clone(),
                    edge_names: vec![step.edge.edge_name.clone()],
                    hop_group: step.hop_group.clone(),
                    synthesized: false,
                });
                i += 1;
                continue;
            }

            // Consume the chain of hidden nodes this step enters.
            let mut edge_names = vec![step.edge.edge_name.clone()];
            let mut j = i + 1;
            let mut end_id: Option<String> = None;
            while j < steps.len() {
                let next = &steps[j];
                edge_names.push(next.edge.edge_name.clone());
                let next_to = self.lookup(node_lookup, &next.to_id)?;
                if !self.registry.is_passthrough(&next_to.node_type) {
                    end_id = Some(next.to_id.clone());
                    j += 1;
                    break;
                }
                j += 1;
            }

            if let Some(end_id) = &end_id {
                let identity = format!("{}|{}|{}", step.from_id, edge_names.join("+"), end_id);
                if synthesized_seen.insert(identity) {
                    synthesized_edges.push(EdgeSummary {
                        source: step.from_id.clone(),
                        name: edge_names.join("+"),
                        target: end_id.clone(),
                        sub_type: None,
                        properties: serde_json::Map::new(),
                    });
                }
            }

            merged.push(MergedStep {
                from_id: step.from_id.clone(),
                to_id: end_id,
                axis: step.axis,
                direction: step.direction.clone(),
                edge_names,
                hop_group: None,
                synthesized: true,
            });
            i = j;
        }

        Ok(merged)
    }

    /// Pass 2: fold consecutive X steps sharing a hop group into logical
    /// resource→transformer→resource steps.
    fn fold_hops(
        &self,
        merged: &[MergedStep],
        node_lookup: &HashMap<&str, &Node>,
    ) -> Result<Vec<LogicalStep>> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < merged.len() {
            let step = &merged[i];

            if step.axis != Axis::X || step.synthesized {
                out.push(self.simple_step(step, node_lookup)?);
                i += 1;
                continue;
            }

            let to_id = match &step.to_id {
                Some(id) => id,
                None => {
                    // Path ended inside a hidden node; emit unclosed
                    out.push(self.simple_step(step, node_lookup)?);
                    i += 1;
                    continue;
                }
            };

            let from_node = self.lookup(node_lookup, &step.from_id)?;
            let to_node = self.lookup(node_lookup, to_id)?;
            let from_role = self.registry.node_role(&from_node.node_type)?.role;
            let to_role = self.registry.node_role(&to_node.node_type)?.role;

            if step.hop_group.is_some() && to_role == NodeRole::Transformer {
                // First half of a hop: look for the completing edge
                if let Some(completing) = self.completing_step(merged, i + 1, to_id, step, node_lookup)? {
                    let mut edge_names = step.edge_names.clone();
                    edge_names.extend(completing.edge_names.iter().cloned());
                    let completed_to = completing
                        .to_id
                        .as_deref()
                        .ok_or_else(|| LineageError::Store("completing step lost its endpoint".into()))?;
                    out.push(LogicalStep {
                        axis: step.axis.as_str().to_string(),
                        direction: Some(step.direction.clone()),
                        from: Some(NodeRef::from_node(from_node)),
                        to: Some(NodeRef::from_node(self.lookup(node_lookup, completed_to)?)),
                        via: Some(NodeRef::from_node(to_node)),
                        edge_names,
                        hop_group: step.hop_group.clone(),
                    });
                    i += 2;
                } else {
                    // Half-hop at the end of the path, or unpaired interior
                    // edge: preserve as an unclosed step
                    out.push(LogicalStep {
                        axis: step.axis.as_str().to_string(),
                        direction: Some(step.direction.clone()),
                        from: Some(NodeRef::from_node(from_node)),
                        to: None,
                        via: Some(NodeRef::from_node(to_node)),
                        edge_names: step.edge_names.clone(),
                        hop_group: step.hop_group.clone(),
                    });
                    i += 1;
                }
            } else if from_role == NodeRole::Transformer && to_role != NodeRole::Transformer {
                // Path began at (or resumed from) a transformer: the hop has
                // no opening edge
                out.push(LogicalStep {
                    axis: step.axis.as_str().to_string(),
                    direction: Some(step.direction.clone()),
                    from: None,
                    to: Some(NodeRef::from_node(to_node)),
                    via: Some(NodeRef::from_node(from_node)),
                    edge_names: step.edge_names.clone(),
                    hop_group: step.hop_group.clone(),
                });
                i += 1;
            } else {
                out.push(self.simple_step(step, node_lookup)?);
                i += 1;
            }
        }

        Ok(out)
    }

    /// The step completing a hop: must continue from the transformer, share
    /// the hop group, and land on a resource.
    fn completing_step<'b>(
        &self,
        merged: &'b [MergedStep],
        index: usize,
        transformer_id: &str,
        first: &MergedStep,
        node_lookup: &HashMap<&str, &Node>,
    ) -> Result<Option<&'b MergedStep>> {
        let next = match merged.get(index) {
            Some(next) => next,
            None => return Ok(None),
        };
        if next.axis != Axis::X || next.synthesized || next.from_id != transformer_id {
            return Ok(None);
        }
        if next.hop_group.is_none() || next.hop_group != first.hop_group {
            return Ok(None);
        }
        let to_id = match &next.to_id {
            Some(id) => id,
            None => return Ok(None),
        };
        let to_node = self.lookup(node_lookup, to_id)?;
        if self.registry.node_role(&to_node.node_type)?.role != NodeRole::Resource {
            return Ok(None);
        }
        Ok(Some(next))
    }

    fn simple_step(
        &self,
        step: &MergedStep,
        node_lookup: &HashMap<&str, &Node>,
    ) -> Result<LogicalStep> {
        let to = match &step.to_id {
            Some(id) => Some(NodeRef::from_node(self.lookup(node_lookup, id)?)),
            None => None,
        };
        Ok(LogicalStep {
            axis: step.axis.as_str().to_string(),
            direction: Some(step.direction.clone()),
            from: Some(NodeRef::from_node(self.lookup(node_lookup, &step.from_id)?)),
            to,
            via: None,
            edge_names: step.edge_names.clone(),
            hop_group: if step.axis == Axis::X {
                step.hop_group.clone()
            } else {
                None
            },
        })
    }

    fn lookup<'b>(
        &self,
        node_lookup: &HashMap<&str, &'b Node>,
        id: &str,
    ) -> Result<&'b Node> {
        node_lookup
            .get(id)
            .copied()
            .ok_or_else(|| LineageError::Store(format!("node {} missing from traversal result", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraversalConfig;
    use crate::traversal::engine::{CancelFlag, TraversalEngine};
    use crate::traversal::{fixtures, TraverseRequest};

    fn limits() -> TraversalConfig {
        TraversalConfig {
            max_z_hops_cap: 4,
            default_max_z_hops: 1,
        }
    }

    fn collapse(request: TraverseRequest) -> TraversalResponse {
        let registry = fixtures::registry();
        let graph = fixtures::fraud_graph();
        let params = request.validate(&limits()).unwrap();
        let engine = TraversalEngine::new(&registry);
        let raw = engine.traverse(&graph, &params, &CancelFlag::new()).unwrap();
        HopCollapser::new(&registry)
            .collapse(&raw, params.include_transformers)
            .unwrap()
    }

    fn request(start: &str, axes: &[&str]) -> TraverseRequest {
        TraverseRequest {
            start_node_id: start.to_string(),
            axes: Some(axes.iter().map(|s| s.to_string()).collect()),
            x_direction: None,
            y_direction: None,
            max_z_hops: None,
            max_depth: None,
            include_transformers: true,
        }
    }

    #[test]
    fn test_upstream_hop_collapses_to_one_step() {
        let mut req = request("ds-002", &["x"]);
        req.x_direction = Some("upstream".to_string());
        let response = collapse(req);

        // The complete path ds-002 -> job-001 -> ds-001 folds into a single
        // logical step
        let folded = response
            .paths
            .iter()
            .find(|p| {
                p.logical_steps.len() == 1
                    && p.logical_steps[0].to.as_ref().map(|n| n.id.as_str()) == Some("ds-001")
            })
            .expect("expected a folded upstream step to ds-001");

        let step = &folded.logical_steps[0];
        assert_eq!(step.axis, "x");
        assert_eq!(step.direction.as_deref(), Some("upstream"));
        assert_eq!(step.from.as_ref().unwrap().id, "ds-002");
        assert_eq!(step.via.as_ref().unwrap().id, "job-001");
        assert_eq!(step.via.as_ref().unwrap().node_type, "etl_job");
        assert_eq!(step.hop_group.as_deref(), Some("dataset_etl"));
        assert_eq!(
            step.edge_names,
            vec!["DATASET_PRODUCED_BY".to_string(), "IS_CONSUMED_BY".to_string()]
        );
    }

    #[test]
    fn test_half_hop_preserved_unclosed() {
        let mut req = request("ds-002", &["x"]);
        req.x_direction = Some("upstream".to_string());
        let response = collapse(req);

        // The BFS also records the path ending at the transformer itself
        let half = response
            .paths
            .iter()
            .find(|p| {
                p.logical_steps.len() == 1 && p.logical_steps[0].to.is_none()
            })
            .expect("expected an unclosed half-hop ending at job-001");
        let step = &half.logical_steps[0];
        assert_eq!(step.via.as_ref().unwrap().id, "job-001");
        assert_eq!(step.edge_names, vec!["DATASET_PRODUCED_BY".to_string()]);
    }

    #[test]
    fn test_downstream_chain_reaches_predictions() {
        let mut req = request("ds-002", &["x"]);
        req.x_direction = Some("downstream".to_string());
        let response = collapse(req);

        let node_ids: Vec<_> = response.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(node_ids.contains(&"ds-003"));
        assert!(node_ids.contains(&"mv-002"));
        assert!(node_ids.contains(&"ds-004"));

        // The scoring path folds into ds-002 -> ds-004 via job-004
        let scored = response.paths.iter().any(|p| {
            p.logical_steps.iter().any(|s| {
                s.via.as_ref().map(|v| v.id.as_str()) == Some("job-004")
                    && s.to.as_ref().map(|t| t.id.as_str()) == Some("ds-004")
                    && s.direction.as_deref() == Some("downstream")
            })
        });
        assert!(scored, "expected folded step through score_transactions");
    }

    #[test]
    fn test_transformers_hidden_but_via_retained() {
        let mut req = request("ds-001", &["x"]);
        req.x_direction = Some("downstream".to_string());
        req.include_transformers = false;
        let response = collapse(req);

        assert!(
            response.nodes.iter().all(|n| n.node_type != "etl_job"),
            "transformer nodes must be dropped from the node list"
        );
        // Raw edges all touch a hidden transformer on this graph
        assert!(response.edges.is_empty());

        let via_present = response.paths.iter().any(|p| {
            p.logical_steps
                .iter()
                .any(|s| s.via.as_ref().map(|v| v.node_type.as_str()) == Some("etl_job"))
        });
        assert!(via_present, "logical steps must still carry via");
    }

    #[test]
    fn test_passthrough_node_elided_with_synthesized_edge() {
        let response = collapse(request("attr-001", &["x"]));

        // dep-001 is visible:false; it must not appear in nodes
        assert!(response.nodes.iter().all(|n| n.id != "dep-001"));

        // The complete path merges into a direct attr-001 -> attr-002 step
        let merged = response
            .paths
            .iter()
            .find(|p| {
                p.logical_steps.len() == 1
                    && p.logical_steps[0].to.as_ref().map(|n| n.id.as_str()) == Some("attr-002")
            })
            .expect("expected merged step across the data dependency");
        let step = &merged.logical_steps[0];
        assert_eq!(step.from.as_ref().unwrap().id, "attr-001");
        assert!(step.via.is_none());
        assert_eq!(
            step.edge_names,
            vec![
                "ATTRIBUTE_CONSUMED_BY".to_string(),
                "ATTRIBUTE_PRODUCED_BY".to_string()
            ]
        );

        // A synthesized direct edge replaces the two consumed ones
        assert!(response
            .edges
            .iter()
            .any(|e| e.source == "attr-001" && e.target == "attr-002"));
        assert!(response
            .edges
            .iter()
            .all(|e| e.source != "dep-001" && e.target != "dep-001"));
    }

    #[test]
    fn test_y_and_z_steps_stay_single() {
        let mut req = request("asys-001", &["y"]);
        req.y_direction = Some("down".to_string());
        let response = collapse(req);

        for path in &response.paths {
            for step in &path.logical_steps {
                assert_eq!(step.axis, "y");
                assert!(step.via.is_none());
                assert!(step.hop_group.is_none());
                assert_eq!(step.edge_names.len(), 1);
                assert_eq!(step.direction.as_deref(), Some("down"));
            }
        }

        let response = collapse(request("ds-002", &["z"]));
        for path in &response.paths {
            for step in &path.logical_steps {
                assert_eq!(step.axis, "z");
                assert!(step.via.is_none());
                // Z records the stored orientation
                let d = step.direction.as_deref().unwrap();
                assert!(d == "outgoing" || d == "incoming");
            }
        }
    }

    #[test]
    fn test_z_metadata() {
        let response = collapse(request("ds-002", &["x", "z"]));
        assert_eq!(response.traversal_metadata.z_hops_taken, 1);
        assert!(response.traversal_metadata.blocked_z_of_z_paths >= 1);
        assert!(response.traversal_metadata.total_nodes_visited >= response.nodes.len());
    }

    #[test]
    fn test_collapsed_paths_remain_contiguous() {
        let mut req = request("ds-004", &["x"]);
        req.x_direction = Some("upstream".to_string());
        let response = collapse(req);

        for path in &response.paths {
            for pair in path.logical_steps.windows(2) {
                let prev_end = pair[0]
                    .to
                    .as_ref()
                    .or(pair[0].via.as_ref())
                    .map(|n| n.id.clone());
                let next_start = pair[1]
                    .from
                    .as_ref()
                    .or(pair[1].via.as_ref())
                    .map(|n| n.id.clone());
                assert_eq!(prev_end, next_start, "steps must chain head to tail");
            }
        }
    }

    #[test]
    fn test_start_node_summary() {
        let response = collapse(request("ds-002", &["z"]));
        assert_eq!(response.start_node.id, "ds-002");
        assert_eq!(response.start_node.node_type, "dataset");
        assert_eq!(response.start_node.name.as_deref(), Some("curated_transactions"));
    }
}
