//! CatalogService: entity-store mutations with best-effort graph mirroring.
//!
//! Every mutation commits to the entity store first; a store error aborts
//! the call and nothing reaches the mirror. On success the fully resolved
//! post-commit state is handed to the sync coordinator, whose failures are
//! swallowed. The relational answer is the answer.

use crate::entity_store::{
    Album, AlbumPatch, Artist, ArtistPatch, CreditKind, EntityStore, LineageKind, NewAlbum,
    NewArtist, NewTrack, StoreError, Track, TrackPatch,
};
use crate::graph_mirror::{EdgeKind, GraphEdge, GraphMirror, MirrorError, NodeKey};
use crate::query::{
    neighborhood, recommend, Neighborhood, DEFAULT_RECOMMENDATION_LIMIT,
};
use crate::sync::{
    album_commit, artist_commit, track_commit, RebuildStats, SyncCoordinator, SyncError,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Counts from both stores, side by side. A node/edge count lower than the
/// entity counts is how mirror lag shows up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub mirror_nodes: usize,
    pub mirror_edges: usize,
    pub failed_mirror_writes: u64,
}

pub struct CatalogService {
    store: Arc<dyn EntityStore>,
    mirror: Arc<dyn GraphMirror>,
    coordinator: SyncCoordinator,
}

impl CatalogService {
    pub fn new(store: Arc<dyn EntityStore>, mirror: Arc<dyn GraphMirror>) -> Self {
        let coordinator = SyncCoordinator::new(mirror.clone());
        CatalogService {
            store,
            mirror,
            coordinator,
        }
    }

    // =========================================================================
    // Entity Mutations
    // =========================================================================

    pub fn create_artist(&self, new: &NewArtist) -> Result<Artist, CatalogError> {
        let artist = self.store.create_artist(new)?;
        self.coordinator
            .mirror_commit(&artist_commit(self.store.as_ref(), &artist)?);
        Ok(artist)
    }

    pub fn update_artist(&self, id: i64, patch: &ArtistPatch) -> Result<Artist, CatalogError> {
        let artist = self.store.update_artist(id, patch)?;
        self.coordinator
            .mirror_commit(&artist_commit(self.store.as_ref(), &artist)?);
        Ok(artist)
    }

    pub fn create_album(&self, new: &NewAlbum) -> Result<Album, CatalogError> {
        let album = self.store.create_album(new)?;
        self.coordinator
            .mirror_commit(&album_commit(self.store.as_ref(), &album)?);
        Ok(album)
    }

    pub fn update_album(&self, id: i64, patch: &AlbumPatch) -> Result<Album, CatalogError> {
        let album = self.store.update_album(id, patch)?;
        self.coordinator
            .mirror_commit(&album_commit(self.store.as_ref(), &album)?);
        Ok(album)
    }

    pub fn create_track(&self, new: &NewTrack) -> Result<Track, CatalogError> {
        let track = self.store.create_track(new)?;
        self.coordinator
            .mirror_commit(&track_commit(self.store.as_ref(), &track)?);
        Ok(track)
    }

    pub fn update_track(&self, id: i64, patch: &TrackPatch) -> Result<Track, CatalogError> {
        let track = self.store.update_track(id, patch)?;
        self.coordinator
            .mirror_commit(&track_commit(self.store.as_ref(), &track)?);
        Ok(track)
    }

    /// Relational delete only. The mirror keeps its node; hydration is what
    /// filters the dangling reference out of query results.
    pub fn delete_artist(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.store.delete_artist(id)?)
    }

    pub fn delete_album(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.store.delete_album(id)?)
    }

    pub fn delete_track(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.store.delete_track(id)?)
    }

    // =========================================================================
    // Association Mutations
    // =========================================================================

    pub fn add_album_track(&self, album_id: i64, track_id: i64) -> Result<(), CatalogError> {
        self.store.add_album_track(album_id, track_id)?;
        self.mirror_track(track_id)?;
        Ok(())
    }

    pub fn remove_album_track(&self, album_id: i64, track_id: i64) -> Result<bool, CatalogError> {
        let removed = self.store.remove_album_track(album_id, track_id)?;
        if removed {
            self.coordinator.mirror_removal(&GraphEdge {
                source: NodeKey::track(track_id),
                target: NodeKey::album(album_id),
                kind: EdgeKind::TrackOf,
            });
        }
        Ok(removed)
    }

    pub fn add_track_performer(&self, track_id: i64, artist_id: i64) -> Result<(), CatalogError> {
        self.store.add_track_performer(track_id, artist_id)?;
        self.mirror_track(track_id)?;
        Ok(())
    }

    pub fn remove_track_performer(
        &self,
        track_id: i64,
        artist_id: i64,
    ) -> Result<bool, CatalogError> {
        let removed = self.store.remove_track_performer(track_id, artist_id)?;
        if removed {
            self.coordinator.mirror_removal(&GraphEdge {
                source: NodeKey::track(track_id),
                target: NodeKey::artist(artist_id),
                kind: EdgeKind::By,
            });
        }
        Ok(removed)
    }

    pub fn add_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<(), CatalogError> {
        self.store.add_track_credit(track_id, artist_id, kind)?;
        self.mirror_track(track_id)?;
        Ok(())
    }

    pub fn remove_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<bool, CatalogError> {
        let removed = self.store.remove_track_credit(track_id, artist_id, kind)?;
        if removed {
            self.coordinator.mirror_removal(&GraphEdge {
                source: NodeKey::track(track_id),
                target: NodeKey::artist(artist_id),
                kind: kind.into(),
            });
        }
        Ok(removed)
    }

    pub fn add_artist_parent(
        &self,
        child_id: i64,
        parent_id: i64,
        kind: LineageKind,
    ) -> Result<(), CatalogError> {
        self.store.add_artist_parent(child_id, parent_id, kind)?;
        if let Some(child) = self.store.get_artist(child_id)? {
            self.coordinator
                .mirror_commit(&artist_commit(self.store.as_ref(), &child)?);
        }
        Ok(())
    }

    pub fn remove_artist_parent(
        &self,
        child_id: i64,
        parent_id: i64,
    ) -> Result<bool, CatalogError> {
        // The relational row carries the lineage kind; capture it before the
        // delete so the exact mirror edge can be removed.
        let kind = self
            .store
            .artist_parents(child_id)?
            .into_iter()
            .find(|(parent, _)| parent.id == parent_id)
            .map(|(_, kind)| kind);

        let removed = self.store.remove_artist_parent(child_id, parent_id)?;
        if removed {
            if let Some(kind) = kind {
                self.coordinator.mirror_removal(&GraphEdge {
                    source: NodeKey::artist(parent_id),
                    target: NodeKey::artist(child_id),
                    kind: kind.into(),
                });
            }
        }
        Ok(removed)
    }

    /// Re-mirror a track's node and complete association list.
    fn mirror_track(&self, track_id: i64) -> Result<(), CatalogError> {
        if let Some(track) = self.store.get_track(track_id)? {
            self.coordinator
                .mirror_commit(&track_commit(self.store.as_ref(), &track)?);
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_artist(&self, id: i64) -> Result<Option<Artist>, CatalogError> {
        Ok(self.store.get_artist(id)?)
    }

    pub fn get_album(&self, id: i64) -> Result<Option<Album>, CatalogError> {
        Ok(self.store.get_album(id)?)
    }

    pub fn get_track(&self, id: i64) -> Result<Option<Track>, CatalogError> {
        Ok(self.store.get_track(id)?)
    }

    pub fn search_artists(&self, q: Option<&str>) -> Result<Vec<Artist>, CatalogError> {
        Ok(self.store.search_artists(q)?)
    }

    pub fn search_albums(&self, q: Option<&str>) -> Result<Vec<Album>, CatalogError> {
        Ok(self.store.search_albums(q)?)
    }

    pub fn search_tracks(&self, q: Option<&str>) -> Result<Vec<Track>, CatalogError> {
        Ok(self.store.search_tracks(q)?)
    }

    /// Deduplicated 2-hop neighborhood of a mirrored node, trimmed for the
    /// wire. `None` when the node is not mirrored.
    pub fn neighborhood(&self, seed: &NodeKey) -> Result<Option<Neighborhood>, CatalogError> {
        Ok(neighborhood(self.mirror.as_ref(), seed)?)
    }

    /// Ranked related artists, hydrated against the entity store. Ranking
    /// order is preserved; ids deleted from the entity store since they were
    /// mirrored are silently dropped.
    pub fn recommendations(
        &self,
        artist_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Artist>, CatalogError> {
        let limit = limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
        let ranked = recommend(self.mirror.as_ref(), artist_id, limit)?;
        Ok(self.store.artists_by_ids(&ranked)?)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub fn rebuild_mirror(&self) -> Result<RebuildStats, CatalogError> {
        Ok(self.coordinator.rebuild(self.store.as_ref())?)
    }

    pub fn resync_updated_since(&self, watermark: i64) -> Result<usize, CatalogError> {
        Ok(self.coordinator.resync(self.store.as_ref(), watermark)?)
    }

    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        Ok(CatalogStats {
            artists: self.store.artists_count()?,
            albums: self.store.albums_count()?,
            tracks: self.store.tracks_count()?,
            mirror_nodes: self.mirror.node_count()?,
            mirror_edges: self.mirror.edge_count()?,
            failed_mirror_writes: self.coordinator.failed_writes(),
        })
    }
}
