//! Sync coordinator: pushes committed relational state into the graph
//! mirror, isolating the caller from mirror failures.

use super::commit::{album_commit, artist_commit, track_commit, EntityCommit};
use crate::entity_store::{EntityStore, StoreError};
use crate::graph_mirror::{GraphEdge, GraphMirror, GraphNode, GraphOp, MirrorError, NodeKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type for the operations whose failures DO propagate: rebuild and
/// resync read the entity store and clear the mirror, and the caller asked
/// for them explicitly.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub edges: usize,
}

/// Owns the one-way flow from entity-store commits to the mirror.
///
/// `mirror_commit` and `mirror_removal` never return an error: the
/// relational result already stands, so a mirror failure is logged and
/// counted, and the mirror is left lagging until the next rebuild or resync.
pub struct SyncCoordinator {
    mirror: Arc<dyn GraphMirror>,
    failed_writes: AtomicU64,
}

impl SyncCoordinator {
    pub fn new(mirror: Arc<dyn GraphMirror>) -> Self {
        SyncCoordinator {
            mirror,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Mirror writes swallowed since startup.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Mirror a committed entity and its complete association list in one
    /// mirror transaction. Best-effort: failures are logged and counted.
    pub fn mirror_commit(&self, commit: &EntityCommit) {
        if let Err(e) = self.mirror.apply(&commit.to_ops()) {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                "Mirror write failed for {} ({} associations): {}",
                commit.entity.key.graph_id(),
                commit.associations.len(),
                e
            );
        }
    }

    /// Remove exactly one (source, kind, target) edge. A parallel edge of
    /// another kind between the same nodes is untouched. Best-effort.
    pub fn mirror_removal(&self, edge: &GraphEdge) {
        if let Err(e) = self.mirror.apply(&[GraphOp::DeleteEdge(*edge)]) {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                "Mirror edge removal failed ({} -{}-> {}): {}",
                edge.source.graph_id(),
                edge.kind.to_db_str(),
                edge.target.graph_id(),
                e
            );
        }
    }

    /// Clear the mirror and re-derive it from the entity store. Artists go
    /// first (nodes plus lineage edges), then album and track nodes, then
    /// the track-anchored edges, so no edge is ever merged ahead of its
    /// endpoints.
    pub fn rebuild(&self, store: &dyn EntityStore) -> Result<RebuildStats, SyncError> {
        self.mirror.clear()?;

        let mut stats = RebuildStats::default();

        for id in store.all_artist_ids()? {
            let Some(artist) = store.get_artist(id)? else {
                continue;
            };
            let mut ops = vec![GraphOp::MergeNode(GraphNode::from(&artist))];
            let children = store.artist_children(id)?;
            // Child snapshots go in ahead of the lineage edges so a child
            // with a higher id is never referenced before its node exists.
            for (child, _) in &children {
                ops.push(GraphOp::MergeNode(GraphNode::from(child)));
            }
            for (child, kind) in &children {
                ops.push(GraphOp::MergeEdge(GraphEdge {
                    source: NodeKey::artist(artist.id),
                    target: NodeKey::artist(child.id),
                    kind: (*kind).into(),
                }));
            }
            self.mirror.apply(&ops)?;
            stats.artists += 1;
        }

        for id in store.all_album_ids()? {
            let Some(album) = store.get_album(id)? else {
                continue;
            };
            self.mirror
                .apply(&[GraphOp::MergeNode(GraphNode::from(&album))])?;
            stats.albums += 1;
        }

        for id in store.all_track_ids()? {
            let Some(track) = store.get_track(id)? else {
                continue;
            };
            self.mirror.apply(&track_commit(store, &track)?.to_ops())?;
            stats.tracks += 1;
        }

        stats.edges = self.mirror.edge_count()?;
        Ok(stats)
    }

    /// Re-mirror every entity written at or after `watermark`. Entity-store
    /// errors propagate; mirror write failures follow the usual
    /// swallow-and-count policy. Returns the number of commits attempted.
    pub fn resync(&self, store: &dyn EntityStore, watermark: i64) -> Result<usize, SyncError> {
        let updated = store.updated_since(watermark)?;
        let total = updated.len();

        for id in updated.artist_ids {
            if let Some(artist) = store.get_artist(id)? {
                self.mirror_commit(&artist_commit(store, &artist)?);
            }
        }
        for id in updated.album_ids {
            if let Some(album) = store.get_album(id)? {
                self.mirror_commit(&album_commit(store, &album)?);
            }
        }
        for id in updated.track_ids {
            if let Some(track) = store.get_track(id)? {
                self.mirror_commit(&track_commit(store, &track)?);
            }
        }

        Ok(total)
    }
}
