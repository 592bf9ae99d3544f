//! Taxonomy registry: parses the edge taxonomy YAML once at startup and
//! answers classification queries in O(1).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{LineageError, Result};
use super::{Axis, EdgeClassification, FlowDirection, HopRole, NodeRole, NodeTypeInfo, SemanticUp};

/// Declarative taxonomy document: two tables.
#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    node_types: HashMap<String, NodeTypeEntry>,
    #[serde(default)]
    edge_rules: Vec<EdgeRuleEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeTypeEntry {
    role: NodeRole,
    #[serde(default = "default_visible")]
    visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct EdgeRuleEntry {
    edge_name: String,
    source: String,
    destination: String,
    #[serde(default)]
    sub_type: Option<String>,
    axis: Axis,
    #[serde(default)]
    hop_group: Option<String>,
    #[serde(default)]
    role_in_hop: Option<HopRole>,
    #[serde(default)]
    semantic_up: Option<SemanticUp>,
}

/// Rules for one (edge_name, source_type, destination_type) triple.
/// A rule keyed on a sub_type shadows the wildcard rule for that value.
#[derive(Debug, Default)]
struct RuleSet {
    by_sub_type: HashMap<String, EdgeClassification>,
    wildcard: Option<EdgeClassification>,
}

/// Indexed, immutable view of the edge taxonomy.
///
/// Process-scoped: constructed once at startup, shared read-only across
/// requests. Construction fails (and prevents startup) on any validation
/// error; lookups afterwards never fail except for unknown node types.
#[derive(Debug)]
pub struct TaxonomyRegistry {
    node_types: HashMap<String, NodeTypeInfo>,
    // edge_name (uppercased) -> (source_type, destination_type) -> rules
    rules: HashMap<String, HashMap<(String, String), RuleSet>>,
}

impl TaxonomyRegistry {
    /// Load and validate a taxonomy document from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(LineageError::Io)?;
        Self::from_yaml(&content)
    }

    /// Build a registry from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_yaml_ng::from_str(content)
            .map_err(|e| LineageError::Taxonomy(format!("YAML parse error: {}", e)))?;

        let mut node_types = HashMap::new();
        for (name, entry) in file.node_types {
            node_types.insert(name.clone(), NodeTypeInfo {
                name,
                role: entry.role,
                visible: entry.visible,
            });
        }

        let mut rules: HashMap<String, HashMap<(String, String), RuleSet>> = HashMap::new();
        let mut hop_group_counts: HashMap<String, usize> = HashMap::new();

        for rule in file.edge_rules {
            let classification = build_classification(&rule, &node_types)?;

            if let Some(group) = &classification.hop_group {
                *hop_group_counts.entry(group.clone()).or_insert(0) += 1;
            }

            let name_key = rule.edge_name.to_uppercase();
            let pair_key = (rule.source.clone(), rule.destination.clone());
            let rule_set = rules
                .entry(name_key)
                .or_default()
                .entry(pair_key)
                .or_default();

            let replaced = match &rule.sub_type {
                Some(sub) => rule_set.by_sub_type.insert(sub.clone(), classification).is_some(),
                None => rule_set.wildcard.replace(classification).is_some(),
            };
            if replaced {
                return Err(LineageError::Taxonomy(format!(
                    "duplicate rule for edge {} ({} -> {}, sub_type {:?})",
                    rule.edge_name, rule.source, rule.destination, rule.sub_type
                )));
            }
        }

        // A hop group appearing in a single rule can never pair up into a
        // logical step.
        for (group, count) in &hop_group_counts {
            if *count < 2 {
                return Err(LineageError::Taxonomy(format!(
                    "hop_group '{}' appears in only {} rule(s); at least two are required",
                    group, count
                )));
            }
        }

        Ok(Self { node_types, rules })
    }

    /// Classify an edge by taxonomy lookup.
    ///
    /// Returns None when no rule matches. The graph may legitimately contain
    /// edges outside the taxonomy; callers skip such edges rather than fail.
    pub fn classify(
        &self,
        edge_name: &str,
        source_type: &str,
        destination_type: &str,
        sub_type: Option<&str>,
    ) -> Option<&EdgeClassification> {
        let rule_set = self.rules
            .get(&edge_name.to_uppercase())?
            .get(&(source_type.to_string(), destination_type.to_string()))?;

        if let Some(sub) = sub_type {
            if let Some(classification) = rule_set.by_sub_type.get(sub) {
                return Some(classification);
            }
        }
        rule_set.wildcard.as_ref()
    }

    /// Look up role and visibility for a node type.
    ///
    /// Unknown types are a configuration error: every node reachable by
    /// traversal must be declared in the taxonomy.
    pub fn node_role(&self, node_type: &str) -> Result<&NodeTypeInfo> {
        self.node_types.get(node_type).ok_or_else(|| {
            LineageError::Taxonomy(format!("unknown node type: {}", node_type))
        })
    }

    /// Whether a node type is declared and hidden from output.
    pub fn is_passthrough(&self, node_type: &str) -> bool {
        self.node_types
            .get(node_type)
            .map(|info| !info.visible)
            .unwrap_or(false)
    }

    /// Convenience for the collapser: hop group of a triple, if any rule
    /// declares one.
    pub fn hop_group(
        &self,
        edge_name: &str,
        source_type: &str,
        destination_type: &str,
    ) -> Option<&str> {
        let rule_set = self.rules
            .get(&edge_name.to_uppercase())?
            .get(&(source_type.to_string(), destination_type.to_string()))?;

        if let Some(classification) = &rule_set.wildcard {
            if let Some(group) = &classification.hop_group {
                return Some(group);
            }
        }
        rule_set
            .by_sub_type
            .values()
            .find_map(|c| c.hop_group.as_deref())
    }
}

/// Validate one rule and derive its normalized classification.
fn build_classification(
    rule: &EdgeRuleEntry,
    node_types: &HashMap<String, NodeTypeInfo>,
) -> Result<EdgeClassification> {
    let source_info = node_types.get(&rule.source).ok_or_else(|| {
        LineageError::Taxonomy(format!(
            "edge {} references undeclared source type '{}'",
            rule.edge_name, rule.source
        ))
    })?;
    let dest_info = node_types.get(&rule.destination).ok_or_else(|| {
        LineageError::Taxonomy(format!(
            "edge {} references undeclared destination type '{}'",
            rule.edge_name, rule.destination
        ))
    })?;

    let x_along_arrow = match rule.axis {
        Axis::X => {
            let hop_role = rule.role_in_hop.ok_or_else(|| {
                LineageError::Taxonomy(format!(
                    "X rule {} ({} -> {}) missing role_in_hop",
                    rule.edge_name, rule.source, rule.destination
                ))
            })?;
            if rule.hop_group.is_none() {
                return Err(LineageError::Taxonomy(format!(
                    "X rule {} ({} -> {}) missing hop_group",
                    rule.edge_name, rule.source, rule.destination
                )));
            }

            // Exactly one endpoint mediates the hop.
            let source_is_transformer = source_info.role == NodeRole::Transformer;
            let dest_is_transformer = dest_info.role == NodeRole::Transformer;
            if source_is_transformer == dest_is_transformer {
                return Err(LineageError::Taxonomy(format!(
                    "X rule {} ({} -> {}) must join a transformer to a non-transformer",
                    rule.edge_name, rule.source, rule.destination
                )));
            }

            // Normalize: in which flow sense does following the stored arrow
            // move? Walking from a resource into the transformer that
            // consumes it heads downstream; walking from a product back into
            // its producer heads upstream.
            let along = match (source_is_transformer, hop_role) {
                (false, HopRole::InputToTransformer) => FlowDirection::Downstream,
                (false, HopRole::OutputFromTransformer) => FlowDirection::Upstream,
                (true, HopRole::OutputFromTransformer) => FlowDirection::Downstream,
                (true, HopRole::InputToTransformer) => FlowDirection::Upstream,
            };
            Some(along)
        }
        Axis::Y => {
            if rule.semantic_up.is_none() {
                return Err(LineageError::Taxonomy(format!(
                    "Y rule {} ({} -> {}) missing semantic_up",
                    rule.edge_name, rule.source, rule.destination
                )));
            }
            None
        }
        Axis::Z => None,
    };

    Ok(EdgeClassification {
        axis: rule.axis,
        hop_group: rule.hop_group.clone(),
        hop_role: rule.role_in_hop,
        semantic_up: rule.semantic_up,
        x_along_arrow,
    })
}
