//! GraphMirror trait definition.

use super::models::{GraphFragment, GraphOp, NodeKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    /// A read exceeded its bounded execution budget. The query failed; no
    /// partial fragment is returned.
    #[error("graph query timed out")]
    Timeout,

    /// The mirror backend cannot be reached. Mutation callers swallow this
    /// (the relational commit stands); rebuild propagates it.
    #[error("graph mirror unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema: {0:#}")]
    Schema(#[from] anyhow::Error),
}

/// Trait for graph mirror backends.
///
/// The write surface is deliberately tiny: merge-node, merge-edge and
/// delete-edge, applied in batches. Everything the sync coordinator does is
/// expressible with those three, and keeping the surface closed is what makes
/// mirror writes idempotent.
pub trait GraphMirror: Send + Sync {
    /// Apply a batch of ops in one transaction, all-or-nothing, in order.
    /// Merging an existing node overwrites its display properties; merging
    /// an existing edge is a no-op.
    fn apply(&self, ops: &[GraphOp]) -> Result<(), MirrorError>;

    /// Breadth-first expansion from `seed`, bounded to `hops`. The fragment
    /// contains every edge incident to a node at depth < hops, plus all the
    /// endpoint nodes those edges reach. Returns `None` when the seed is not
    /// mirrored.
    fn expand(&self, seed: &NodeKey, hops: u32) -> Result<Option<GraphFragment>, MirrorError>;

    /// Drop all nodes and edges. Only the rebuild path calls this.
    fn clear(&self) -> Result<(), MirrorError>;

    fn node_count(&self) -> Result<usize, MirrorError>;
    fn edge_count(&self) -> Result<usize, MirrorError>;
}
