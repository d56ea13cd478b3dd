//! EntityStore trait definition.
//!
//! Abstracts the authoritative relational store so the catalog service and
//! the mirror rebuild logic can run against any backend (production SQLite,
//! test fixtures).

use super::models::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness or composite-constraint violation on the authoritative
    /// store. Surfaced to the caller as a rejected mutation; no mirror
    /// write is attempted for it.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Schema creation or validation failure when opening the database.
    #[error("schema: {0:#}")]
    Schema(#[from] anyhow::Error),
}

/// Entity ids touched since a resync watermark, per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdatedEntities {
    pub artist_ids: Vec<i64>,
    pub album_ids: Vec<i64>,
    pub track_ids: Vec<i64>,
}

impl UpdatedEntities {
    pub fn is_empty(&self) -> bool {
        self.artist_ids.is_empty() && self.album_ids.is_empty() && self.track_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artist_ids.len() + self.album_ids.len() + self.track_ids.len()
    }
}

/// Trait for authoritative catalog storage backends.
pub trait EntityStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    /// Create a new artist, including any initial parent lineage rows,
    /// in one transaction.
    fn create_artist(&self, new: &NewArtist) -> Result<Artist, StoreError>;

    /// Apply a partial update. Unset patch fields are left untouched.
    fn update_artist(&self, id: i64, patch: &ArtistPatch) -> Result<Artist, StoreError>;

    fn get_artist(&self, id: i64) -> Result<Option<Artist>, StoreError>;

    /// Point lookup by the unique natural key.
    fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>, StoreError>;

    /// Substring search over names; `None` returns everything.
    fn search_artists(&self, q: Option<&str>) -> Result<Vec<Artist>, StoreError>;

    /// Bulk lookup preserving input order; ids no longer present are
    /// silently skipped.
    fn artists_by_ids(&self, ids: &[i64]) -> Result<Vec<Artist>, StoreError>;

    /// Delete the relational record. Junction rows cascade; the mirror is
    /// deliberately left alone.
    fn delete_artist(&self, id: i64) -> Result<bool, StoreError>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn create_album(&self, new: &NewAlbum) -> Result<Album, StoreError>;
    fn update_album(&self, id: i64, patch: &AlbumPatch) -> Result<Album, StoreError>;
    fn get_album(&self, id: i64) -> Result<Option<Album>, StoreError>;
    fn find_album_by_title(&self, title: &str) -> Result<Option<Album>, StoreError>;
    fn search_albums(&self, q: Option<&str>) -> Result<Vec<Album>, StoreError>;
    fn delete_album(&self, id: i64) -> Result<bool, StoreError>;

    // =========================================================================
    // Tracks
    // =========================================================================

    fn create_track(&self, new: &NewTrack) -> Result<Track, StoreError>;
    fn update_track(&self, id: i64, patch: &TrackPatch) -> Result<Track, StoreError>;
    fn get_track(&self, id: i64) -> Result<Option<Track>, StoreError>;
    fn find_track_by_title(&self, title: &str) -> Result<Option<Track>, StoreError>;
    fn search_tracks(&self, q: Option<&str>) -> Result<Vec<Track>, StoreError>;
    fn delete_track(&self, id: i64) -> Result<bool, StoreError>;

    // =========================================================================
    // Associations
    // =========================================================================

    fn add_album_track(&self, album_id: i64, track_id: i64) -> Result<(), StoreError>;
    fn remove_album_track(&self, album_id: i64, track_id: i64) -> Result<bool, StoreError>;

    fn add_track_performer(&self, track_id: i64, artist_id: i64) -> Result<(), StoreError>;
    fn remove_track_performer(&self, track_id: i64, artist_id: i64) -> Result<bool, StoreError>;

    fn add_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<(), StoreError>;
    fn remove_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<bool, StoreError>;

    fn add_artist_parent(
        &self,
        child_id: i64,
        parent_id: i64,
        kind: LineageKind,
    ) -> Result<(), StoreError>;
    fn remove_artist_parent(&self, child_id: i64, parent_id: i64) -> Result<bool, StoreError>;

    // =========================================================================
    // Association Listings (the post-commit state the mirror consumes)
    // =========================================================================

    fn track_performers(&self, track_id: i64) -> Result<Vec<Artist>, StoreError>;
    fn track_albums(&self, track_id: i64) -> Result<Vec<Album>, StoreError>;
    fn album_tracks(&self, album_id: i64) -> Result<Vec<Track>, StoreError>;
    fn track_credits(&self, track_id: i64) -> Result<Vec<(Artist, CreditKind)>, StoreError>;
    fn artist_credits(&self, artist_id: i64) -> Result<Vec<(Track, CreditKind)>, StoreError>;
    fn artist_performances(&self, artist_id: i64) -> Result<Vec<Track>, StoreError>;
    fn artist_parents(&self, child_id: i64) -> Result<Vec<(Artist, LineageKind)>, StoreError>;
    fn artist_children(&self, parent_id: i64) -> Result<Vec<(Artist, LineageKind)>, StoreError>;

    // =========================================================================
    // Rebuild / Stats Support
    // =========================================================================

    fn all_artist_ids(&self) -> Result<Vec<i64>, StoreError>;
    fn all_album_ids(&self) -> Result<Vec<i64>, StoreError>;
    fn all_track_ids(&self) -> Result<Vec<i64>, StoreError>;

    fn artists_count(&self) -> Result<usize, StoreError>;
    fn albums_count(&self) -> Result<usize, StoreError>;
    fn tracks_count(&self) -> Result<usize, StoreError>;

    /// Ids of entities written at or after the given unix timestamp.
    /// Drives the periodic mirror resync.
    fn updated_since(&self, ts: i64) -> Result<UpdatedEntities, StoreError>;
}
