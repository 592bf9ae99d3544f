//! Shared test fixture: the fraud-detection seed graph as an in-memory
//! store, classified by the shipped taxonomy.

use crate::graph::MemoryGraph;
use crate::taxonomy::TaxonomyRegistry;

/// Registry built from the taxonomy document shipped with the repo, so
/// tests and the deployed service agree on classification.
pub(crate) fn registry() -> TaxonomyRegistry {
    TaxonomyRegistry::from_yaml(include_str!("../../metamodel/edge_taxonomy.yaml"))
        .expect("shipped taxonomy must validate")
}

/// In-memory mirror of seed/fraud_detection.yaml.
pub(crate) fn fraud_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();

    // Datasets
    g.add_node("ds-001", "dataset", "raw_transactions");
    g.add_node("ds-002", "dataset", "curated_transactions");
    g.add_node("ds-003", "dataset", "fraud_feature_set");
    g.add_node_with_sub_type("ds-004", "dataset", "fraud_predictions", Some("knowledge_base"));
    g.add_node_with_sub_type("ds-005", "dataset", "txn_quality_results", Some("resultset"));

    // Jobs
    g.add_node_with_sub_type("job-001", "etl_job", "ingest_raw_transactions", Some("etl"));
    g.add_node_with_sub_type("job-002", "etl_job", "build_fraud_features", Some("etl"));
    g.add_node_with_sub_type("job-003", "etl_job", "train_fraud_model", Some("training"));
    g.add_node_with_sub_type("job-004", "etl_job", "score_transactions", Some("inference"));

    // Model hierarchy
    g.add_node("model-001", "model", "fraud_detection_model");
    g.add_node("mv-001", "model_version", "fraud_model_v1");
    g.add_node("mv-002", "model_version", "fraud_model_v2");

    // Cross-cutting context
    g.add_node("uc-001", "use_case", "fraud_detection");
    g.add_node("ws-001", "workspace", "fraud_detection_workspace");
    g.add_node("wssvc-001", "workspace_service", "fraud_model_service");

    // Agentic review system
    g.add_node("asys-001", "agentic_system", "fraud_review_system");
    g.add_node("asysv-001", "agentic_system_version", "fraud_review_v1");
    g.add_node("agv-001", "agent_version", "fraud_reviewer_agent_v1");

    // Attribute-level lineage
    g.add_node_with_sub_type("attr-001", "attribute", "txn_amount", Some("logical"));
    g.add_node_with_sub_type("attr-002", "attribute", "txn_amount_usd", Some("logical"));
    g.add_node("dep-001", "data_dependency", "normalize_txn_amount");

    // Outside the taxonomy on purpose
    g.add_node("user-001", "user", "data_engineering");

    // X: dataset lineage through jobs
    g.add_edge("ds-001", "IS_CONSUMED_BY", "job-001");
    g.add_edge("ds-002", "DATASET_PRODUCED_BY", "job-001");
    g.add_edge("ds-002", "IS_CONSUMED_BY", "job-002");
    g.add_edge("ds-003", "DATASET_PRODUCED_BY", "job-002");
    g.add_edge_with_sub_type("ds-003", "IS_CONSUMED_BY", "job-003", Some("training_data"));
    g.add_edge("mv-002", "DATASET_PRODUCED_BY", "job-003");
    g.add_edge("mv-002", "IS_CONSUMED_BY", "job-004");
    g.add_edge_with_sub_type("ds-002", "IS_CONSUMED_BY", "job-004", Some("scoring_input"));
    g.add_edge("ds-004", "DATASET_PRODUCED_BY", "job-004");

    // X: attribute lineage through a data dependency
    g.add_edge("attr-001", "ATTRIBUTE_CONSUMED_BY", "dep-001");
    g.add_edge("attr-002", "ATTRIBUTE_PRODUCED_BY", "dep-001");

    // Y: hierarchies
    g.add_edge("asys-001", "HAS_VERSION", "asysv-001");
    g.add_edge("asysv-001", "HAS_MEMBER", "agv-001");
    g.add_edge("model-001", "MODEL_TO_MODEL_VERSION", "mv-001");
    g.add_edge("model-001", "MODEL_TO_MODEL_VERSION", "mv-002");
    g.add_edge("model-001", "MODEL_USE_CASE", "uc-001");
    g.add_edge("attr-001", "IS_ATTRIBUTE_FOR", "ds-001");
    g.add_edge("attr-002", "IS_ATTRIBUTE_FOR", "ds-002");
    g.add_edge("ws-001", "INSTALLED", "wssvc-001");

    // Z: associations
    g.add_edge("ws-001", "WORKSPACE_DATASET", "ds-002");
    g.add_edge("ws-001", "WORKSPACE_USE_CASE", "uc-001");
    g.add_edge("uc-001", "USE_CASE_DATASET", "ds-002");
    g.add_edge("uc-001", "USE_CASE_DATASET", "ds-003");
    g.add_edge("ds-005", "RESULTSETS_DATASET", "ds-002");
    g.add_edge("agv-001", "USES", "ds-004");
    g.add_edge("asys-001", "SYSTEM_USE_CASE", "uc-001");

    // Untaxonomied edge: must be ignored by traversal
    g.add_edge("ds-002", "CREATED_BY", "user-001");

    g
}
