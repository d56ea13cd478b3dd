//! The typed command object handed to the sync coordinator after every
//! relational commit.

use crate::entity_store::{Album, Artist, EntityStore, StoreError, Track};
use crate::graph_mirror::{EdgeKind, GraphEdge, GraphNode, GraphOp};

/// One association of the committed entity, carrying the partner node's
/// snapshot so node merges can precede edge merges even on a cold mirror.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitAssociation {
    pub partner: GraphNode,
    pub edge: GraphEdge,
}

/// Snapshot of a committed entity plus the complete current list of its
/// associations. Mirroring it is idempotent: replaying the same commit any
/// number of times converges on the same graph.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityCommit {
    pub entity: GraphNode,
    pub associations: Vec<CommitAssociation>,
}

impl EntityCommit {
    pub fn new(entity: GraphNode) -> Self {
        EntityCommit {
            entity,
            associations: Vec::new(),
        }
    }

    /// Add an association whose edge runs from the committed entity to the
    /// partner.
    pub fn edge_to(&mut self, partner: GraphNode, kind: EdgeKind) {
        let edge = GraphEdge {
            source: self.entity.key,
            target: partner.key,
            kind,
        };
        self.associations.push(CommitAssociation { partner, edge });
    }

    /// Add an association whose edge runs from the partner to the committed
    /// entity.
    pub fn edge_from(&mut self, partner: GraphNode, kind: EdgeKind) {
        let edge = GraphEdge {
            source: partner.key,
            target: self.entity.key,
            kind,
        };
        self.associations.push(CommitAssociation { partner, edge });
    }

    /// Lower the commit into mirror ops: the entity node first, then every
    /// partner node, then the edges. Node merges strictly precede edge
    /// merges so a replay against an empty mirror still lands.
    pub fn to_ops(&self) -> Vec<GraphOp> {
        let mut ops = Vec::with_capacity(1 + self.associations.len() * 2);
        ops.push(GraphOp::MergeNode(self.entity.clone()));
        for assoc in &self.associations {
            ops.push(GraphOp::MergeNode(assoc.partner.clone()));
        }
        for assoc in &self.associations {
            ops.push(GraphOp::MergeEdge(assoc.edge));
        }
        ops
    }
}

/// Build the full commit for an artist: lineage in both directions plus
/// every track the artist performs on or is credited on.
pub fn artist_commit(store: &dyn EntityStore, artist: &Artist) -> Result<EntityCommit, StoreError> {
    let mut commit = EntityCommit::new(GraphNode::from(artist));
    for (parent, kind) in store.artist_parents(artist.id)? {
        commit.edge_from(GraphNode::from(&parent), kind.into());
    }
    for (child, kind) in store.artist_children(artist.id)? {
        commit.edge_to(GraphNode::from(&child), kind.into());
    }
    for track in store.artist_performances(artist.id)? {
        commit.edge_from(GraphNode::from(&track), EdgeKind::By);
    }
    for (track, kind) in store.artist_credits(artist.id)? {
        commit.edge_from(GraphNode::from(&track), kind.into());
    }
    Ok(commit)
}

/// Build the full commit for an album: its current track list.
pub fn album_commit(store: &dyn EntityStore, album: &Album) -> Result<EntityCommit, StoreError> {
    let mut commit = EntityCommit::new(GraphNode::from(album));
    for track in store.album_tracks(album.id)? {
        commit.edge_from(GraphNode::from(&track), EdgeKind::TrackOf);
    }
    Ok(commit)
}

/// Build the full commit for a track: performers, album memberships and
/// credits.
pub fn track_commit(store: &dyn EntityStore, track: &Track) -> Result<EntityCommit, StoreError> {
    let mut commit = EntityCommit::new(GraphNode::from(track));
    for artist in store.track_performers(track.id)? {
        commit.edge_to(GraphNode::from(&artist), EdgeKind::By);
    }
    for album in store.track_albums(track.id)? {
        commit.edge_to(GraphNode::from(&album), EdgeKind::TrackOf);
    }
    for (artist, kind) in store.track_credits(track.id)? {
        commit.edge_to(GraphNode::from(&artist), kind.into());
    }
    Ok(commit)
}
