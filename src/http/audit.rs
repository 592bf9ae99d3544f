//! Traversal request audit logging.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::traversal::TraversalParams;

/// Record a served traversal request in the query_logs table.
///
/// Best-effort: audit failures are logged and never fail the request.
pub async fn log_query(
    db: &Db,
    request: &TraversalParams,
    node_count: usize,
    duration_ms: u64,
    success: bool,
    error_message: Option<&str>,
) {
    let query_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339();
    let start_node_id = request.start_node_id.clone();
    let axes = request
        .axes
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let max_z_hops = request.max_z_hops;
    let max_depth = request.max_depth;
    let error = error_message.map(String::from);

    let result = db
        .with_connection(move |conn| {
            conn.execute(
                "INSERT INTO query_logs (
                    query_id, timestamp, start_node_id, axes, max_z_hops,
                    max_depth, node_count, duration_ms, success, error_message
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    query_id,
                    timestamp,
                    start_node_id,
                    axes,
                    max_z_hops,
                    max_depth,
                    node_count as i64,
                    duration_ms as i64,
                    success,
                    error
                ],
            )?;
            Ok(())
        })
        .await;

    if let Err(e) = result {
        log::warn!("failed to write query audit record: {}", e);
    }
}
