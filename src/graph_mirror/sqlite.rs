//! SQLite-backed graph mirror.
//!
//! Nodes are keyed (label, id) and edges (source, kind, target); both carry
//! UNIQUE constraints so merges are plain upserts. Reads run under a bounded
//! execution budget enforced through SQLite's progress handler; writes are
//! transactional and carry no deadline.

use super::models::{EdgeKind, GraphEdge, GraphFragment, GraphNode, GraphOp, NodeKey, NodeLabel};
use super::trait_def::{GraphMirror, MirrorError};
use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::info;

const NODES_TABLE: Table = Table {
    name: "nodes",
    columns: &[
        sqlite_column!("label", SqlType::Text, non_null = true),
        sqlite_column!("id", SqlType::Integer, non_null = true),
        sqlite_column!("name", SqlType::Text),
        sqlite_column!("title", SqlType::Text),
        sqlite_column!("reading", SqlType::Text),
        sqlite_column!("kind", SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["label", "id"]],
};

const EDGES_TABLE: Table = Table {
    name: "edges",
    columns: &[
        sqlite_column!("src_label", SqlType::Text, non_null = true),
        sqlite_column!("src_id", SqlType::Integer, non_null = true),
        sqlite_column!("kind", SqlType::Text, non_null = true),
        sqlite_column!("dst_label", SqlType::Text, non_null = true),
        sqlite_column!("dst_id", SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_edges_src", "src_label, src_id"),
        ("idx_edges_dst", "dst_label, dst_id"),
    ],
    unique_constraints: &[&["src_label", "src_id", "kind", "dst_label", "dst_id"]],
};

const GRAPH_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[NODES_TABLE, EDGES_TABLE],
    migration: None,
};

/// Progress-handler polling interval, in SQLite VM instructions.
const PROGRESS_STEP: std::os::raw::c_int = 64;

/// Scoped connection session. A read session arms a deadline through the
/// progress handler; dropping the session disarms it on every exit path, so
/// a failed query can never leave a stale handler on the pooled connection.
pub(crate) struct GraphSession<'a> {
    conn: MutexGuard<'a, Connection>,
    armed: bool,
}

impl<'a> GraphSession<'a> {
    pub(crate) fn read(conn: MutexGuard<'a, Connection>, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        conn.progress_handler(PROGRESS_STEP, Some(move || Instant::now() > deadline));
        GraphSession { conn, armed: true }
    }
}

impl Drop for GraphSession<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.conn.progress_handler(0, None::<fn() -> bool>);
        }
    }
}

impl Deref for GraphSession<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

/// Map an interrupted statement to a timeout, leave anything else as-is.
fn map_read_err(err: rusqlite::Error) -> MirrorError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::OperationInterrupted =>
        {
            MirrorError::Timeout
        }
        _ => MirrorError::Sqlite(err),
    }
}

fn parse_node_row(row: &rusqlite::Row) -> rusqlite::Result<GraphNode> {
    let label: String = row.get(0)?;
    Ok(GraphNode {
        key: NodeKey {
            label: NodeLabel::from_db_str(&label),
            id: row.get(1)?,
        },
        name: row.get(2)?,
        title: row.get(3)?,
        reading: row.get(4)?,
        kind: row.get(5)?,
    })
}

fn parse_edge_row(row: &rusqlite::Row) -> rusqlite::Result<GraphEdge> {
    let src_label: String = row.get(0)?;
    let kind: String = row.get(2)?;
    let dst_label: String = row.get(3)?;
    Ok(GraphEdge {
        source: NodeKey {
            label: NodeLabel::from_db_str(&src_label),
            id: row.get(1)?,
        },
        kind: EdgeKind::from_db_str(&kind),
        target: NodeKey {
            label: NodeLabel::from_db_str(&dst_label),
            id: row.get(4)?,
        },
    })
}

/// SQLite graph mirror with a single write connection and a round-robin pool
/// of deadline-guarded read connections.
#[derive(Clone)]
pub struct SqliteGraphMirror {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
    read_timeout: Duration,
}

impl SqliteGraphMirror {
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        read_pool_size: usize,
        read_timeout: Duration,
    ) -> Result<Self, MirrorError> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        GRAPH_SCHEMA.ensure(&write_conn)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let node_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))
            .unwrap_or(0);
        let edge_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened graph mirror: {} nodes, {} edges", node_count, edge_count);

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteGraphMirror {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
            read_timeout,
        })
    }

    fn read_session(&self) -> GraphSession<'_> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        GraphSession::read(self.read_pool[index].lock().unwrap(), self.read_timeout)
    }

    fn with_write_txn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, MirrorError>,
    ) -> Result<T, MirrorError> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(&conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn get_node(conn: &Connection, key: &NodeKey) -> Result<Option<GraphNode>, MirrorError> {
        let mut stmt = conn
            .prepare_cached(
                "SELECT label, id, name, title, reading, kind FROM nodes
                 WHERE label = ?1 AND id = ?2",
            )
            .map_err(map_read_err)?;
        match stmt.query_row(params![key.label.to_db_str(), key.id], parse_node_row) {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_read_err(e)),
        }
    }

    fn incident_edges(conn: &Connection, key: &NodeKey) -> Result<Vec<GraphEdge>, MirrorError> {
        let mut stmt = conn
            .prepare_cached(
                "SELECT src_label, src_id, kind, dst_label, dst_id FROM edges
                 WHERE (src_label = ?1 AND src_id = ?2)
                    OR (dst_label = ?1 AND dst_id = ?2)",
            )
            .map_err(map_read_err)?;
        let edges = stmt
            .query_map(params![key.label.to_db_str(), key.id], parse_edge_row)
            .map_err(map_read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_read_err)?;
        Ok(edges)
    }
}

impl GraphMirror for SqliteGraphMirror {
    fn apply(&self, ops: &[GraphOp]) -> Result<(), MirrorError> {
        self.with_write_txn(|conn| {
            for op in ops {
                match op {
                    GraphOp::MergeNode(node) => {
                        conn.execute(
                            "INSERT INTO nodes (label, id, name, title, reading, kind)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                             ON CONFLICT (label, id) DO UPDATE SET
                                 name = excluded.name,
                                 title = excluded.title,
                                 reading = excluded.reading,
                                 kind = excluded.kind",
                            params![
                                node.key.label.to_db_str(),
                                node.key.id,
                                &node.name,
                                &node.title,
                                &node.reading,
                                &node.kind,
                            ],
                        )?;
                    }
                    GraphOp::MergeEdge(edge) => {
                        conn.execute(
                            "INSERT OR IGNORE INTO edges
                                 (src_label, src_id, kind, dst_label, dst_id)
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![
                                edge.source.label.to_db_str(),
                                edge.source.id,
                                edge.kind.to_db_str(),
                                edge.target.label.to_db_str(),
                                edge.target.id,
                            ],
                        )?;
                    }
                    GraphOp::DeleteEdge(edge) => {
                        conn.execute(
                            "DELETE FROM edges
                             WHERE src_label = ?1 AND src_id = ?2 AND kind = ?3
                               AND dst_label = ?4 AND dst_id = ?5",
                            params![
                                edge.source.label.to_db_str(),
                                edge.source.id,
                                edge.kind.to_db_str(),
                                edge.target.label.to_db_str(),
                                edge.target.id,
                            ],
                        )?;
                    }
                }
            }
            Ok(())
        })
    }

    fn expand(&self, seed: &NodeKey, hops: u32) -> Result<Option<GraphFragment>, MirrorError> {
        let session = self.read_session();

        let seed_node = match Self::get_node(&session, seed)? {
            Some(node) => node,
            None => return Ok(None),
        };

        let mut nodes: HashMap<NodeKey, GraphNode> = HashMap::new();
        nodes.insert(*seed, seed_node);
        let mut edges: HashSet<GraphEdge> = HashSet::new();
        let mut visited: HashSet<NodeKey> = HashSet::new();
        visited.insert(*seed);
        let mut frontier = vec![*seed];

        for _ in 0..hops {
            let mut next_frontier = Vec::new();
            for key in &frontier {
                for edge in Self::incident_edges(&session, key)? {
                    edges.insert(edge);
                    let other = if edge.source == *key {
                        edge.target
                    } else {
                        edge.source
                    };
                    if visited.insert(other) {
                        next_frontier.push(other);
                        // Endpoint nodes always exist: edges are only merged
                        // after their endpoints, and nodes are never deleted.
                        if let Some(node) = Self::get_node(&session, &other)? {
                            nodes.insert(other, node);
                        }
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(Some(GraphFragment {
            nodes: nodes.into_values().collect(),
            edges: edges.into_iter().collect(),
        }))
    }

    fn clear(&self) -> Result<(), MirrorError> {
        self.with_write_txn(|conn| {
            conn.execute("DELETE FROM edges", [])?;
            conn.execute("DELETE FROM nodes", [])?;
            Ok(())
        })
    }

    fn node_count(&self) -> Result<usize, MirrorError> {
        let session = self.read_session();
        let count: i64 = session
            .query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))
            .map_err(map_read_err)?;
        Ok(count as usize)
    }

    fn edge_count(&self) -> Result<usize, MirrorError> {
        let session = self.read_session();
        let count: i64 = session
            .query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))
            .map_err(map_read_err)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LONG_TIMEOUT: Duration = Duration::from_secs(5);

    fn open_mirror() -> (SqliteGraphMirror, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mirror =
            SqliteGraphMirror::new(tmp.path().join("graph.db"), 2, LONG_TIMEOUT).unwrap();
        (mirror, tmp)
    }

    fn artist_node(id: i64, name: &str) -> GraphNode {
        GraphNode {
            key: NodeKey::artist(id),
            name: Some(name.into()),
            title: None,
            reading: None,
            kind: Some("INDIVIDUAL".into()),
        }
    }

    fn track_node(id: i64, title: &str) -> GraphNode {
        GraphNode {
            key: NodeKey::track(id),
            name: None,
            title: Some(title.into()),
            reading: None,
            kind: None,
        }
    }

    fn by_edge(track_id: i64, artist_id: i64) -> GraphEdge {
        GraphEdge {
            source: NodeKey::track(track_id),
            target: NodeKey::artist(artist_id),
            kind: EdgeKind::By,
        }
    }

    #[test]
    fn apply_is_idempotent() {
        let (mirror, _tmp) = open_mirror();
        let ops = vec![
            GraphOp::MergeNode(artist_node(1, "A")),
            GraphOp::MergeNode(track_node(1, "T")),
            GraphOp::MergeEdge(by_edge(1, 1)),
        ];
        mirror.apply(&ops).unwrap();
        mirror.apply(&ops).unwrap();

        assert_eq!(mirror.node_count().unwrap(), 2);
        assert_eq!(mirror.edge_count().unwrap(), 1);
    }

    #[test]
    fn node_remerge_overwrites_display_props() {
        let (mirror, _tmp) = open_mirror();
        mirror
            .apply(&[GraphOp::MergeNode(artist_node(1, "Old Name"))])
            .unwrap();
        mirror
            .apply(&[GraphOp::MergeNode(artist_node(1, "New Name"))])
            .unwrap();

        let fragment = mirror.expand(&NodeKey::artist(1), 2).unwrap().unwrap();
        assert_eq!(fragment.nodes.len(), 1);
        assert_eq!(fragment.nodes[0].name.as_deref(), Some("New Name"));
        assert_eq!(mirror.node_count().unwrap(), 1);
    }

    #[test]
    fn delete_edge_is_exact_match() {
        let (mirror, _tmp) = open_mirror();
        let producer_edge = GraphEdge {
            source: NodeKey::track(1),
            target: NodeKey::artist(1),
            kind: EdgeKind::Producer,
        };
        mirror
            .apply(&[
                GraphOp::MergeNode(artist_node(1, "A")),
                GraphOp::MergeNode(track_node(1, "T")),
                GraphOp::MergeEdge(by_edge(1, 1)),
                GraphOp::MergeEdge(producer_edge),
            ])
            .unwrap();

        mirror.apply(&[GraphOp::DeleteEdge(by_edge(1, 1))]).unwrap();

        let fragment = mirror.expand(&NodeKey::track(1), 1).unwrap().unwrap();
        assert_eq!(fragment.edges, vec![producer_edge]);
    }

    #[test]
    fn expand_respects_hop_boundary() {
        let (mirror, _tmp) = open_mirror();
        // chain: artist 1 <- track 1 -> album 1 <- track 2 -> artist 2
        mirror
            .apply(&[
                GraphOp::MergeNode(artist_node(1, "A1")),
                GraphOp::MergeNode(artist_node(2, "A2")),
                GraphOp::MergeNode(track_node(1, "T1")),
                GraphOp::MergeNode(track_node(2, "T2")),
                GraphOp::MergeNode(GraphNode {
                    key: NodeKey::album(1),
                    name: None,
                    title: Some("Album".into()),
                    reading: None,
                    kind: None,
                }),
                GraphOp::MergeEdge(by_edge(1, 1)),
                GraphOp::MergeEdge(by_edge(2, 2)),
                GraphOp::MergeEdge(GraphEdge {
                    source: NodeKey::track(1),
                    target: NodeKey::album(1),
                    kind: EdgeKind::TrackOf,
                }),
                GraphOp::MergeEdge(GraphEdge {
                    source: NodeKey::track(2),
                    target: NodeKey::album(1),
                    kind: EdgeKind::TrackOf,
                }),
            ])
            .unwrap();

        // From artist 1, two hops reach track 1 (hop 1) and its incident
        // edges, so album 1 appears; track 2 sits at hop 3 and must not.
        let fragment = mirror.expand(&NodeKey::artist(1), 2).unwrap().unwrap();
        let keys: HashSet<NodeKey> = fragment.nodes.iter().map(|n| n.key).collect();
        assert!(keys.contains(&NodeKey::artist(1)));
        assert!(keys.contains(&NodeKey::track(1)));
        assert!(keys.contains(&NodeKey::album(1)));
        assert!(!keys.contains(&NodeKey::track(2)));
        assert_eq!(fragment.edges.len(), 2);
    }

    #[test]
    fn expand_unmirrored_seed_is_none() {
        let (mirror, _tmp) = open_mirror();
        assert!(mirror.expand(&NodeKey::artist(999), 2).unwrap().is_none());
    }

    #[test]
    fn clear_empties_both_tables() {
        let (mirror, _tmp) = open_mirror();
        mirror
            .apply(&[
                GraphOp::MergeNode(artist_node(1, "A")),
                GraphOp::MergeNode(track_node(1, "T")),
                GraphOp::MergeEdge(by_edge(1, 1)),
            ])
            .unwrap();
        mirror.clear().unwrap();
        assert_eq!(mirror.node_count().unwrap(), 0);
        assert_eq!(mirror.edge_count().unwrap(), 0);
    }

    #[test]
    fn expired_session_interrupts_statement() {
        let conn = Mutex::new(Connection::open_in_memory().unwrap());
        let guard = conn.lock().unwrap();
        let session = GraphSession::read(guard, Duration::ZERO);
        // A statement long enough that the progress handler is guaranteed
        // to fire at least once.
        let result: Result<i64, _> = session.query_row(
            "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM cnt WHERE x < 100000)
             SELECT COUNT(*) FROM cnt",
            [],
            |r| r.get(0),
        );
        assert!(matches!(
            result.map_err(map_read_err),
            Err(MirrorError::Timeout)
        ));
        drop(session);

        // The handler is disarmed after the session drops
        let conn = conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM cnt WHERE x < 1000)
                 SELECT COUNT(*) FROM cnt",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1000);
    }
}
