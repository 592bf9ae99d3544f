//! Edge taxonomy: the single source of truth for how edges are classified
//! and traversed in the lineage graph.
//!
//! Every edge is assigned to one of three axes: X (derivation), Y
//! (hierarchy), Z (association). Classification also carries the data the
//! engine needs to normalize semantic direction independently of how the
//! edge happens to be stored.

mod registry;

pub use registry::TaxonomyRegistry;

use serde::{Deserialize, Serialize};

/// Graph traversal axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Lineage / derivation
    X,
    /// Hierarchy / containment
    Y,
    /// Association / cross-cutting
    Z,
}

impl Axis {
    /// Parse a request-level axis code ("x", "y", "z")
    pub fn parse(s: &str) -> Option<Axis> {
        match s {
            "x" | "X" => Some(Axis::X),
            "y" | "Y" => Some(Axis::Y),
            "z" | "Z" => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Role a node type plays in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Resource,
    Transformer,
    Structural,
    Container,
    Qualifier,
}

/// Which half of a logical X step an edge rule represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopRole {
    InputToTransformer,
    OutputFromTransformer,
}

/// Whether following the stored arrow of a Y edge moves up the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticUp {
    /// Stored arrow points up; traversing it goes up.
    Forward,
    /// Stored arrow points down; going up requires reversing it.
    Reverse,
}

/// Sense of travel along the X axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Upstream,
    Downstream,
}

impl FlowDirection {
    pub fn flip(self) -> FlowDirection {
        match self {
            FlowDirection::Upstream => FlowDirection::Downstream,
            FlowDirection::Downstream => FlowDirection::Upstream,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::Upstream => "upstream",
            FlowDirection::Downstream => "downstream",
        }
    }
}

/// Node type metadata
#[derive(Debug, Clone)]
pub struct NodeTypeInfo {
    pub name: String,
    pub role: NodeRole,
    pub visible: bool,
}

/// Classification produced by a registry lookup for one concrete edge.
///
/// `x_along_arrow` is precomputed at registry construction: the flow sense
/// when traversing the stored arrow source→destination. The engine flips it
/// for incoming edges and never reasons about hop roles directly.
#[derive(Debug, Clone)]
pub struct EdgeClassification {
    pub axis: Axis,
    pub hop_group: Option<String>,
    pub hop_role: Option<HopRole>,
    pub semantic_up: Option<SemanticUp>,
    pub x_along_arrow: Option<FlowDirection>,
}
