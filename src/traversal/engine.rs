//! Bounded BFS traversal with per-path axis constraints.
//!
//! The engine walks the graph level by level, classifying every candidate
//! edge through the taxonomy registry and tracking state per path tip: the
//! node list walked so far, the number of Z (association) hops spent, the
//! axis used to arrive, and the depth. The Z cap is enforced per path, not
//! globally: two sibling paths may each spend their own association hop.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LineageError, Result};
use crate::graph::{EdgeDirection, GraphStore, Node, StoredEdge};
use crate::taxonomy::{Axis, EdgeClassification, SemanticUp, TaxonomyRegistry};
use super::{TraversalParams, XDirectionFilter, YDirectionFilter};

/// Cooperative cancellation signal checked between frontier iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One edge traversal within a path, in traversal orientation.
#[derive(Debug, Clone)]
pub struct RawStep {
    pub from_id: String,
    pub to_id: String,
    pub edge: StoredEdge,
    pub axis: Axis,
    /// upstream/downstream for X, up/down for Y, stored orientation for Z.
    pub direction: String,
    pub hop_group: Option<String>,
}

/// A full path from the start node to one reached node.
#[derive(Debug, Clone)]
pub struct RawPath {
    pub node_ids: Vec<String>,
    pub steps: Vec<RawStep>,
    pub z_hops: u32,
}

/// Raw traversal output, prior to collapsing.
#[derive(Debug)]
pub struct RawTraversal {
    pub start_node: Node,
    pub nodes: Vec<Node>,
    pub edges: Vec<StoredEdge>,
    pub paths: Vec<RawPath>,
    pub max_z_taken: u32,
    pub blocked_z_of_z_paths: u64,
    pub classification_misses: u64,
    node_ids: HashSet<String>,
    edge_ids: HashSet<String>,
}

impl RawTraversal {
    fn new(start_node: Node) -> Self {
        let mut node_ids = HashSet::new();
        node_ids.insert(start_node.id.clone());
        Self {
            nodes: vec![start_node.clone()],
            start_node,
            edges: Vec::new(),
            paths: Vec::new(),
            max_z_taken: 0,
            blocked_z_of_z_paths: 0,
            classification_misses: 0,
            node_ids,
            edge_ids: HashSet::new(),
        }
    }

    fn add_node(&mut self, node: &Node) {
        if self.node_ids.insert(node.id.clone()) {
            self.nodes.push(node.clone());
        }
    }

    fn add_edge(&mut self, edge: &StoredEdge) {
        if self.edge_ids.insert(edge.identity()) {
            self.edges.push(edge.clone());
        }
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node_ids.contains(node_id)
    }
}

/// Per-path-tip BFS state.
#[derive(Debug, Clone)]
struct TraversalState {
    node_id: String,
    node_type: String,
    path: Vec<String>,
    steps: Vec<RawStep>,
    z_hops_taken: u32,
    last_axis: Option<Axis>,
    depth: u32,
}

/// The traversal engine. Holds only a reference to the process-scoped
/// registry; all traversal state is request-scoped.
pub struct TraversalEngine<'a> {
    registry: &'a TaxonomyRegistry,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(registry: &'a TaxonomyRegistry) -> Self {
        Self { registry }
    }

    /// Execute a bounded BFS from the start node.
    ///
    /// Fails with `StartNotFound` when the start node is absent, `Cancelled`
    /// when the flag trips, and propagates store errors without partial
    /// results.
    pub fn traverse(
        &self,
        store: &dyn GraphStore,
        params: &TraversalParams,
        cancel: &CancelFlag,
    ) -> Result<RawTraversal> {
        let start = store
            .get_node(&params.start_node_id)?
            .ok_or_else(|| LineageError::StartNotFound(params.start_node_id.clone()))?;
        // Unknown start type is a configuration error, not a silent skip
        self.registry.node_role(&start.node_type)?;

        let mut result = RawTraversal::new(start.clone());

        let mut queue = VecDeque::new();
        queue.push_back(TraversalState {
            node_id: start.id.clone(),
            node_type: start.node_type.clone(),
            path: vec![start.id.clone()],
            steps: Vec::new(),
            z_hops_taken: 0,
            last_axis: None,
            depth: 0,
        });

        // States already enqueued, keyed (node, z budget spent, arrival
        // axis). Equivalent path tips expand identically, so re-enqueueing
        // them only duplicates path records.
        let mut visited_states: HashSet<(String, u32, Option<Axis>)> = HashSet::new();
        visited_states.insert((start.id.clone(), 0, None));

        while let Some(state) = queue.pop_front() {
            if cancel.is_cancelled() {
                return Err(LineageError::Cancelled);
            }

            if let Some(max_depth) = params.max_depth {
                if state.depth >= max_depth {
                    continue;
                }
            }

            for incident in store.neighbors(&state.node_id)? {
                let outgoing = incident.direction == EdgeDirection::Outgoing;

                // Endpoint types in stored orientation for the lookup
                let (source_type, destination_type) = if outgoing {
                    (state.node_type.as_str(), incident.neighbor.node_type.as_str())
                } else {
                    (incident.neighbor.node_type.as_str(), state.node_type.as_str())
                };

                let classification = match self.registry.classify(
                    &incident.edge.edge_name,
                    source_type,
                    destination_type,
                    incident.edge.sub_type.as_deref(),
                ) {
                    Some(c) => c,
                    None => {
                        // Edge outside the taxonomy: ignored, counted for
                        // diagnostics
                        result.classification_misses += 1;
                        continue;
                    }
                };

                if !params.axes.contains(&classification.axis) {
                    continue;
                }

                let direction = match admit_direction(classification, outgoing, params) {
                    Some(label) => label,
                    None => continue,
                };

                if classification.axis == Axis::Z && state.z_hops_taken >= params.max_z_hops {
                    result.blocked_z_of_z_paths += 1;
                    continue;
                }

                // Within-path cycle guard
                if state.path.iter().any(|id| id == &incident.neighbor.id) {
                    continue;
                }

                let step = RawStep {
                    from_id: state.node_id.clone(),
                    to_id: incident.neighbor.id.clone(),
                    edge: incident.edge.clone(),
                    axis: classification.axis,
                    direction: direction.to_string(),
                    hop_group: classification.hop_group.clone(),
                };

                let mut path = state.path.clone();
                path.push(incident.neighbor.id.clone());
                let mut steps = state.steps.clone();
                steps.push(step);

                let next_state = TraversalState {
                    node_id: incident.neighbor.id.clone(),
                    node_type: incident.neighbor.node_type.clone(),
                    path,
                    steps,
                    z_hops_taken: state.z_hops_taken
                        + if classification.axis == Axis::Z { 1 } else { 0 },
                    last_axis: Some(classification.axis),
                    depth: state.depth + 1,
                };

                let state_key = (
                    next_state.node_id.clone(),
                    next_state.z_hops_taken,
                    next_state.last_axis,
                );
                if !visited_states.insert(state_key) {
                    continue;
                }

                self.registry.node_role(&next_state.node_type)?;

                result.add_node(&incident.neighbor);
                result.add_edge(&incident.edge);
                result.max_z_taken = result.max_z_taken.max(next_state.z_hops_taken);
                result.paths.push(RawPath {
                    node_ids: next_state.path.clone(),
                    steps: next_state.steps.clone(),
                    z_hops: next_state.z_hops_taken,
                });

                queue.push_back(next_state);
            }
        }

        Ok(result)
    }
}

/// Direction filter: decide whether an edge may be traversed in the current
/// orientation, and with which semantic label.
///
/// Classification already normalized the stored arrow (`x_along_arrow`,
/// `semantic_up`), so this reasons purely in semantic terms. Z edges are
/// undirected for reachability; their label records the stored orientation.
fn admit_direction(
    classification: &EdgeClassification,
    outgoing: bool,
    params: &TraversalParams,
) -> Option<&'static str> {
    match classification.axis {
        Axis::X => {
            let along = classification.x_along_arrow?;
            let sense = if outgoing { along } else { along.flip() };
            let admitted = match params.x_direction {
                XDirectionFilter::Both => true,
                XDirectionFilter::Upstream => {
                    sense == crate::taxonomy::FlowDirection::Upstream
                }
                XDirectionFilter::Downstream => {
                    sense == crate::taxonomy::FlowDirection::Downstream
                }
            };
            admitted.then(|| sense.as_str())
        }
        Axis::Y => {
            let semantic_up = classification.semantic_up?;
            let moves_up = (semantic_up == SemanticUp::Forward) == outgoing;
            let admitted = match params.y_direction {
                YDirectionFilter::Both => true,
                YDirectionFilter::Up => moves_up,
                YDirectionFilter::Down => !moves_up,
            };
            admitted.then(|| if moves_up { "up" } else { "down" })
        }
        Axis::Z => Some(if outgoing { "outgoing" } else { "incoming" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::fixtures;
    use crate::traversal::TraverseRequest;
    use crate::config::TraversalConfig;

    fn limits() -> TraversalConfig {
        TraversalConfig {
            max_z_hops_cap: 4,
            default_max_z_hops: 1,
        }
    }

    fn run(request: TraverseRequest) -> RawTraversal {
        let registry = fixtures::registry();
        let graph = fixtures::fraud_graph();
        let params = request.validate(&limits()).unwrap();
        let engine = TraversalEngine::new(&registry);
        engine.traverse(&graph, &params, &CancelFlag::new()).unwrap()
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
    fn test_start_not_found() {
        let registry = fixtures::registry();
        let graph = fixtures::fraud_graph();
        let params = request("ds-999", &["x"]).validate(&limits()).unwrap();
        let engine = TraversalEngine::new(&registry);
        let err = engine
            .traverse(&graph, &params, &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, LineageError::StartNotFound(_)));
    }

    #[test]
    fn test_x_upstream_from_curated_transactions() {
        let mut req = request("ds-002", &["x"]);
        req.x_direction = Some("upstream".to_string());
        let result = run(req);

        // ds-002 <- job-001 <- ds-001, nothing downstream
        assert!(result.contains_node("job-001"));
        assert!(result.contains_node("ds-001"));
        assert!(!result.contains_node("ds-003"));
        assert!(!result.contains_node("ds-004"));
        assert!(!result.contains_node("job-002"));
    }

    #[test]
    fn test_x_downstream_from_curated_transactions() {
        let mut req = request("ds-002", &["x"]);
        req.x_direction = Some("downstream".to_string());
        let result = run(req);

        // Feature build, training, and scoring chains
        assert!(result.contains_node("ds-003"));
        assert!(result.contains_node("mv-002"));
        assert!(result.contains_node("ds-004"));
        assert!(result.contains_node("job-002"));
        assert!(result.contains_node("job-004"));
        // Upstream material must not appear
        assert!(!result.contains_node("ds-001"));
        assert!(!result.contains_node("job-001"));
    }

    #[test]
    fn test_x_upstream_full_lineage_from_predictions() {
        let mut req = request("ds-004", &["x"]);
        req.x_direction = Some("upstream".to_string());
        let result = run(req);

        assert!(result.contains_node("ds-002"));
        assert!(result.contains_node("ds-001"));
        let job_nodes: Vec<_> = result
            .nodes
            .iter()
            .filter(|n| n.node_type == "etl_job")
            .collect();
        assert!(!job_nodes.is_empty(), "transformer jobs should be visited");
    }

    #[test]
    fn test_y_down_from_review_system() {
        let mut req = request("asys-001", &["y"]);
        req.y_direction = Some("down".to_string());
        let result = run(req);

        assert!(result.contains_node("asysv-001"));
        assert!(result.contains_node("agv-001"));
        // Down only: the system's use-case association is Z, not Y
        assert!(!result.contains_node("uc-001"));
    }

    #[test]
    fn test_y_up_from_agent_version() {
        let mut req = request("agv-001", &["y"]);
        req.y_direction = Some("up".to_string());
        let result = run(req);

        assert!(result.contains_node("asysv-001"));
        assert!(result.contains_node("asys-001"));
    }

    #[test]
    fn test_z_single_hop_associations() {
        let result = run(request("ds-002", &["z"]));

        assert!(result.contains_node("ds-002"));
        assert!(result.contains_node("ws-001"));
        assert!(result.contains_node("uc-001"));
        assert!(result.contains_node("ds-005"));
        // One association hop only: the workspace's other associations are
        // out of reach
        assert!(!result.contains_node("ds-003"));
        for path in &result.paths {
            assert!(path.z_hops <= 1);
        }
    }

    #[test]
    fn test_z_zero_hops_returns_start_only() {
        let mut req = request("ds-002", &["z"]);
        req.max_z_hops = Some(0);
        let result = run(req);

        assert_eq!(result.nodes.len(), 1);
        assert!(result.paths.is_empty());
        assert!(result.blocked_z_of_z_paths >= 1);
    }

    #[test]
    fn test_xz_z_of_z_blocked() {
        let result = run(request("ds-002", &["x", "z"]));

        // Z neighbors reached
        assert!(result.contains_node("uc-001"));
        assert!(result.contains_node("ws-001"));

        // No path may spend two Z hops
        for path in &result.paths {
            let z_steps = path.steps.iter().filter(|s| s.axis == Axis::Z).count();
            assert!(
                z_steps <= 1,
                "Z-of-Z violation on path {:?}",
                path.node_ids
            );
            assert_eq!(z_steps as u32, path.z_hops);
        }

        // The seed graph is dense in associations; at least one Z-of-Z
        // continuation must have been rejected
        assert!(result.blocked_z_of_z_paths >= 1);
    }

    #[test]
    fn test_z_then_y_continuation_allowed() {
        let result = run(request("ds-002", &["x", "y", "z"]));

        // ds-002 -Z-> ws-001 -Y-> wssvc-001
        assert!(result.contains_node("wssvc-001"));
        let continued = result.paths.iter().any(|p| {
            p.node_ids.ends_with(&["ws-001".to_string(), "wssvc-001".to_string()])
                && p.z_hops == 1
        });
        assert!(continued, "expected Z->Y continuation through the workspace");

        // ds-002 -Z-> uc-001 -Y-> model-001
        let model_via_use_case = result.paths.iter().any(|p| {
            p.node_ids.ends_with(&["uc-001".to_string(), "model-001".to_string()])
        });
        assert!(model_via_use_case, "expected Z->Y continuation to the model");
    }

    #[test]
    fn test_axis_exclusivity() {
        for axis in ["x", "y", "z"] {
            let result = run(request("ds-002", &[axis]));
            let expected = Axis::parse(axis).unwrap();
            for path in &result.paths {
                for step in &path.steps {
                    assert_eq!(step.axis, expected);
                }
            }
        }
    }

    #[test]
    fn test_max_depth_zero() {
        let mut req = request("ds-002", &["x", "y", "z"]);
        req.max_depth = Some(0);
        let result = run(req);

        assert_eq!(result.nodes.len(), 1);
        assert!(result.edges.is_empty());
        assert!(result.paths.is_empty());
    }

    #[test]
    fn test_monotone_in_depth_and_z() {
        let shallow = run({
            let mut r = request("ds-002", &["x", "y", "z"]);
            r.max_depth = Some(2);
            r
        });
        let deep = run(request("ds-002", &["x", "y", "z"]));
        for node in &shallow.nodes {
            assert!(
                deep.contains_node(&node.id),
                "deepening dropped node {}",
                node.id
            );
        }

        let one_z = run(request("ds-002", &["x", "y", "z"]));
        let two_z = run({
            let mut r = request("ds-002", &["x", "y", "z"]);
            r.max_z_hops = Some(2);
            r
        });
        for node in &one_z.nodes {
            assert!(two_z.contains_node(&node.id));
        }
    }

    #[test]
    fn test_full_traversal_is_superset_of_restricted() {
        let full = run(request("ds-002", &["x", "y", "z"]));
        for axes in [&["x"][..], &["y"][..], &["z"][..], &["x", "z"][..]] {
            let restricted = run(request("ds-002", axes));
            for node in &restricted.nodes {
                assert!(
                    full.contains_node(&node.id),
                    "restricted traversal {:?} found {} outside the full result",
                    axes,
                    node.id
                );
            }
        }

        let mut upstream_only = request("ds-002", &["x"]);
        upstream_only.x_direction = Some("upstream".to_string());
        let restricted = run(upstream_only);
        for node in &restricted.nodes {
            assert!(full.contains_node(&node.id));
        }
    }

    #[test]
    fn test_idempotent_result_sets() {
        let a = run(request("ds-002", &["x", "y", "z"]));
        let b = run(request("ds-002", &["x", "y", "z"]));

        let nodes_a: Vec<_> = a.nodes.iter().map(|n| n.id.clone()).collect();
        let nodes_b: Vec<_> = b.nodes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(nodes_a, nodes_b);

        let edges_a: Vec<_> = a.edges.iter().map(|e| e.identity()).collect();
        let edges_b: Vec<_> = b.edges.iter().map(|e| e.identity()).collect();
        assert_eq!(edges_a, edges_b);
    }

    #[test]
    fn test_paths_are_contiguous_and_acyclic() {
        let result = run(request("ds-002", &["x", "y", "z"]));
        for path in &result.paths {
            // No node repeats within a path
            let mut seen = HashSet::new();
            for id in &path.node_ids {
                assert!(seen.insert(id.clone()), "node {} repeated in path", id);
            }
            // Steps chain head to tail
            for (i, step) in path.steps.iter().enumerate() {
                assert_eq!(step.from_id, path.node_ids[i]);
                assert_eq!(step.to_id, path.node_ids[i + 1]);
            }
        }
    }

    #[test]
    fn test_untaxonomied_edge_ignored() {
        let result = run(request("ds-002", &["x", "y", "z"]));
        // The CREATED_BY edge and its user endpoint are outside the taxonomy
        assert!(!result.contains_node("user-001"));
        assert!(result.classification_misses >= 1);
    }

    #[test]
    fn test_cancellation() {
        let registry = fixtures::registry();
        let graph = fixtures::fraud_graph();
        let params = request("ds-002", &["x", "y", "z"])
            .validate(&limits())
            .unwrap();
        let engine = TraversalEngine::new(&registry);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = engine.traverse(&graph, &params, &cancel).unwrap_err();
        assert!(matches!(err, LineageError::Cancelled));
    }

    #[test]
    fn test_response_nodes_match_path_endpoints() {
        let result = run(request("ds-002", &["x", "y", "z"]));
        let mut endpoint_ids: HashSet<String> = HashSet::new();
        endpoint_ids.insert(result.start_node.id.clone());
        for path in &result.paths {
            for id in &path.node_ids {
                endpoint_ids.insert(id.clone());
            }
        }
        let node_ids: HashSet<String> =
            result.nodes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(endpoint_ids, node_ids);
    }
}
