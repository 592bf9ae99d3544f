//! SQLite adjacency adapter over the `nodes` and `edges` tables.

use rusqlite::Connection;

use crate::error::{LineageError, Result};
use super::{EdgeDirection, GraphStore, IncidentEdge, Node, StoredEdge};

/// Graph store backed by a borrowed SQLite connection.
///
/// Intended to live inside a `Db::with_connection` closure for the duration
/// of one traversal.
pub struct SqliteGraphStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteGraphStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_properties(raw: Option<String>) -> serde_json::Map<String, serde_json::Value> {
        raw.and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
            .and_then(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn row_to_node(
        id: String,
        node_type: String,
        sub_type: Option<String>,
        properties_json: Option<String>,
    ) -> Node {
        Node {
            id,
            node_type,
            sub_type,
            properties: Self::parse_properties(properties_json),
        }
    }
}

impl<'a> GraphStore for SqliteGraphStore<'a> {
    fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        let mut stmt = self.conn.prepare(
            "SELECT node_id, node_type, sub_type, properties_json FROM nodes WHERE node_id = ?1",
        )?;
        let mut rows = stmt.query_map([node_id], |row| {
            Ok(Self::row_to_node(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
            ))
        })?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(LineageError::Database)?)),
            None => Ok(None),
        }
    }

    fn neighbors(&self, node_id: &str) -> Result<Vec<IncidentEdge>> {
        let mut incident = Vec::new();

        // Outgoing edges, far endpoint is the target. Edges whose endpoint is
        // missing from nodes are dropped by the join.
        let mut stmt = self.conn.prepare(
            "SELECT e.source_id, e.edge_name, e.target_id, e.sub_type, e.properties_json, \
                    n.node_id, n.node_type, n.sub_type, n.properties_json \
             FROM edges e JOIN nodes n ON n.node_id = e.target_id \
             WHERE e.source_id = ?1 \
             ORDER BY e.edge_id",
        )?;
        let rows = stmt.query_map([node_id], |row| {
            Ok(IncidentEdge {
                edge: StoredEdge {
                    source_id: row.get(0)?,
                    edge_name: row.get(1)?,
                    target_id: row.get(2)?,
                    sub_type: row.get(3)?,
                    properties: Self::parse_properties(row.get(4)?),
                },
                direction: EdgeDirection::Outgoing,
                neighbor: Self::row_to_node(
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ),
            })
        })?;
        for row in rows {
            incident.push(row.map_err(LineageError::Database)?);
        }

        // Incoming edges, far endpoint is the source. Self-loops already
        // appeared in the outgoing pass.
        let mut stmt = self.conn.prepare(
            "SELECT e.source_id, e.edge_name, e.target_id, e.sub_type, e.properties_json, \
                    n.node_id, n.node_type, n.sub_type, n.properties_json \
             FROM edges e JOIN nodes n ON n.node_id = e.source_id \
             WHERE e.target_id = ?1 AND e.source_id != ?1 \
             ORDER BY e.edge_id",
        )?;
        let rows = stmt.query_map([node_id], |row| {
            Ok(IncidentEdge {
                edge: StoredEdge {
                    source_id: row.get(0)?,
                    edge_name: row.get(1)?,
                    target_id: row.get(2)?,
                    sub_type: row.get(3)?,
                    properties: Self::parse_properties(row.get(4)?),
                },
                direction: EdgeDirection::Incoming,
                neighbor: Self::row_to_node(
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ),
            })
        })?;
        for row in rows {
            incident.push(row.map_err(LineageError::Database)?);
        }

        Ok(incident)
    }
}
