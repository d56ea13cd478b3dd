//! SQLite-backed implementation of the authoritative entity store.

use super::models::*;
use super::schema::ENTITY_SCHEMA;
use super::trait_def::{EntityStore, StoreError, UpdatedEntities};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

const TOUCH_TIMESTAMP: &str = "cast(strftime('%s','now') as int)";

/// SQLite-backed entity store with a single write connection and a
/// round-robin pool of read connections.
#[derive(Clone)]
pub struct SqliteEntityStore {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
}

/// Map a constraint violation to a typed conflict, leave anything else as a
/// storage error.
fn constraint_to_conflict(err: rusqlite::Error, detail: String) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(detail)
        }
        _ => StoreError::Sqlite(err),
    }
}

fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    let kind: String = row.get(2)?;
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: ArtistKind::from_db_str(&kind),
        reading: row.get(3)?,
    })
}

fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        artwork: row.get(2)?,
        reading: row.get(3)?,
    })
}

fn parse_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artwork: row.get(2)?,
        reading: row.get(3)?,
    })
}

impl SqliteEntityStore {
    /// Open (or create) the entity database.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self, StoreError> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        ENTITY_SCHEMA.ensure(&write_conn)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", true)?;

        let artist_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM artists", [], |r| r.get(0))
            .unwrap_or(0);
        let album_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))
            .unwrap_or(0);
        let track_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))
            .unwrap_or(0);
        info!(
            "Opened catalog: {} artists, {} albums, {} tracks",
            artist_count, album_count, track_count
        );

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

        Ok(SqliteEntityStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn with_write_txn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
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

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    fn artist_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM artists WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    fn album_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM albums WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    fn track_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tracks WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    fn require_artist(conn: &Connection, id: i64) -> Result<(), StoreError> {
        if Self::artist_exists(conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("artist {} not found", id)))
        }
    }

    fn require_album(conn: &Connection, id: i64) -> Result<(), StoreError> {
        if Self::album_exists(conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("album {} not found", id)))
        }
    }

    fn require_track(conn: &Connection, id: i64) -> Result<(), StoreError> {
        if Self::track_exists(conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("track {} not found", id)))
        }
    }

    fn get_artist_inner(conn: &Connection, id: i64) -> Result<Option<Artist>, StoreError> {
        let mut stmt =
            conn.prepare_cached("SELECT id, name, kind, reading FROM artists WHERE id = ?1")?;
        match stmt.query_row(params![id], parse_artist_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_album_inner(conn: &Connection, id: i64) -> Result<Option<Album>, StoreError> {
        let mut stmt =
            conn.prepare_cached("SELECT id, title, artwork, reading FROM albums WHERE id = ?1")?;
        match stmt.query_row(params![id], parse_album_row) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_track_inner(conn: &Connection, id: i64) -> Result<Option<Track>, StoreError> {
        let mut stmt =
            conn.prepare_cached("SELECT id, title, artwork, reading FROM tracks WHERE id = ?1")?;
        match stmt.query_row(params![id], parse_track_row) {
            Ok(track) => Ok(Some(track)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Bump an entity's updated_at so the resync watermark picks it up.
    fn touch(conn: &Connection, table: &str, id: i64) -> Result<(), StoreError> {
        conn.execute(
            &format!(
                "UPDATE {} SET updated_at = {} WHERE id = ?1",
                table, TOUCH_TIMESTAMP
            ),
            params![id],
        )?;
        Ok(())
    }

    fn insert_lineage(
        conn: &Connection,
        parent_id: i64,
        child_id: i64,
        kind: LineageKind,
    ) -> Result<(), StoreError> {
        Self::require_artist(conn, parent_id)?;
        conn.execute(
            "INSERT INTO artist_lineage (parent_id, child_id, kind) VALUES (?1, ?2, ?3)",
            params![parent_id, child_id, kind.to_db_str()],
        )
        .map_err(|e| {
            constraint_to_conflict(
                e,
                format!(
                    "lineage ({} -> {}) already exists",
                    parent_id, child_id
                ),
            )
        })?;
        Ok(())
    }
}

impl EntityStore for SqliteEntityStore {
    // =========================================================================
    // Artists
    // =========================================================================

    fn create_artist(&self, new: &NewArtist) -> Result<Artist, StoreError> {
        self.with_write_txn(|conn| {
            conn.execute(
                "INSERT INTO artists (name, kind, reading) VALUES (?1, ?2, ?3)",
                params![&new.name, new.kind.to_db_str(), &new.reading],
            )
            .map_err(|e| {
                constraint_to_conflict(e, format!("artist '{}' already exists", new.name))
            })?;
            let id = conn.last_insert_rowid();

            for parent in &new.parents {
                Self::insert_lineage(conn, parent.artist_id, id, parent.kind)?;
            }

            Ok(Artist {
                id,
                name: new.name.clone(),
                kind: new.kind,
                reading: new.reading.clone(),
            })
        })
    }

    fn update_artist(&self, id: i64, patch: &ArtistPatch) -> Result<Artist, StoreError> {
        self.with_write_txn(|conn| {
            let current = Self::get_artist_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("artist {} not found", id)))?;

            let name = patch.name.clone().unwrap_or(current.name);
            let reading = patch.reading.clone().or(current.reading);

            conn.execute(
                &format!(
                    "UPDATE artists SET name = ?1, reading = ?2, updated_at = {} WHERE id = ?3",
                    TOUCH_TIMESTAMP
                ),
                params![&name, &reading, id],
            )
            .map_err(|e| constraint_to_conflict(e, format!("artist '{}' already exists", name)))?;

            Ok(Artist {
                id,
                name,
                kind: current.kind,
                reading,
            })
        })
    }

    fn get_artist(&self, id: i64) -> Result<Option<Artist>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_artist_inner(&conn, id)
    }

    fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id, name, kind, reading FROM artists WHERE name = ?1")?;
        match stmt.query_row(params![name], parse_artist_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn search_artists(&self, q: Option<&str>) -> Result<Vec<Artist>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, kind, reading FROM artists
             WHERE ?1 IS NULL OR name LIKE '%' || ?1 || '%'
             ORDER BY id",
        )?;
        let artists = stmt
            .query_map(params![q], parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn artists_by_ids(&self, ids: &[i64]) -> Result<Vec<Artist>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id, name, kind, reading FROM artists WHERE id = ?1")?;
        let mut artists = Vec::with_capacity(ids.len());
        for id in ids {
            match stmt.query_row(params![id], parse_artist_row) {
                Ok(artist) => artists.push(artist),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(artists)
    }

    fn delete_artist(&self, id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let deleted = conn.execute("DELETE FROM artists WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    // =========================================================================
    // Albums
    // =========================================================================

    fn create_album(&self, new: &NewAlbum) -> Result<Album, StoreError> {
        self.with_write_txn(|conn| {
            conn.execute(
                "INSERT INTO albums (title, artwork, reading) VALUES (?1, ?2, ?3)",
                params![&new.title, &new.artwork, &new.reading],
            )
            .map_err(|e| {
                constraint_to_conflict(e, format!("album '{}' already exists", new.title))
            })?;
            let id = conn.last_insert_rowid();

            for track_id in &new.track_ids {
                Self::require_track(conn, *track_id)?;
                conn.execute(
                    "INSERT INTO track_albums (track_id, album_id) VALUES (?1, ?2)",
                    params![track_id, id],
                )
                .map_err(|e| {
                    constraint_to_conflict(
                        e,
                        format!("track {} already on album {}", track_id, id),
                    )
                })?;
            }

            Ok(Album {
                id,
                title: new.title.clone(),
                artwork: new.artwork.clone(),
                reading: new.reading.clone(),
            })
        })
    }

    fn update_album(&self, id: i64, patch: &AlbumPatch) -> Result<Album, StoreError> {
        self.with_write_txn(|conn| {
            let current = Self::get_album_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("album {} not found", id)))?;

            let title = patch.title.clone().unwrap_or(current.title);
            let artwork = patch.artwork.clone().or(current.artwork);
            let reading = patch.reading.clone().or(current.reading);

            conn.execute(
                &format!(
                    "UPDATE albums SET title = ?1, artwork = ?2, reading = ?3, updated_at = {} WHERE id = ?4",
                    TOUCH_TIMESTAMP
                ),
                params![&title, &artwork, &reading, id],
            )
            .map_err(|e| constraint_to_conflict(e, format!("album '{}' already exists", title)))?;

            Ok(Album {
                id,
                title,
                artwork,
                reading,
            })
        })
    }

    fn get_album(&self, id: i64) -> Result<Option<Album>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_album_inner(&conn, id)
    }

    fn find_album_by_title(&self, title: &str) -> Result<Option<Album>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id, title, artwork, reading FROM albums WHERE title = ?1")?;
        match stmt.query_row(params![title], parse_album_row) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn search_albums(&self, q: Option<&str>) -> Result<Vec<Album>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, artwork, reading FROM albums
             WHERE ?1 IS NULL OR title LIKE '%' || ?1 || '%'
             ORDER BY id",
        )?;
        let albums = stmt
            .query_map(params![q], parse_album_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn delete_album(&self, id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let deleted = conn.execute("DELETE FROM albums WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    fn create_track(&self, new: &NewTrack) -> Result<Track, StoreError> {
        self.with_write_txn(|conn| {
            conn.execute(
                "INSERT INTO tracks (title, artwork, reading) VALUES (?1, ?2, ?3)",
                params![&new.title, &new.artwork, &new.reading],
            )
            .map_err(|e| {
                constraint_to_conflict(e, format!("track '{}' already exists", new.title))
            })?;
            let id = conn.last_insert_rowid();

            for artist_id in &new.artist_ids {
                Self::require_artist(conn, *artist_id)?;
                conn.execute(
                    "INSERT INTO track_performers (track_id, artist_id) VALUES (?1, ?2)",
                    params![id, artist_id],
                )
                .map_err(|e| {
                    constraint_to_conflict(
                        e,
                        format!("artist {} already performs track {}", artist_id, id),
                    )
                })?;
            }
            for album_id in &new.album_ids {
                Self::require_album(conn, *album_id)?;
                conn.execute(
                    "INSERT INTO track_albums (track_id, album_id) VALUES (?1, ?2)",
                    params![id, album_id],
                )
                .map_err(|e| {
                    constraint_to_conflict(
                        e,
                        format!("track {} already on album {}", id, album_id),
                    )
                })?;
            }

            Ok(Track {
                id,
                title: new.title.clone(),
                artwork: new.artwork.clone(),
                reading: new.reading.clone(),
            })
        })
    }

    fn update_track(&self, id: i64, patch: &TrackPatch) -> Result<Track, StoreError> {
        self.with_write_txn(|conn| {
            let current = Self::get_track_inner(conn, id)?
                .ok_or_else(|| StoreError::NotFound(format!("track {} not found", id)))?;

            let title = patch.title.clone().unwrap_or(current.title);
            let artwork = patch.artwork.clone().or(current.artwork);
            let reading = patch.reading.clone().or(current.reading);

            conn.execute(
                &format!(
                    "UPDATE tracks SET title = ?1, artwork = ?2, reading = ?3, updated_at = {} WHERE id = ?4",
                    TOUCH_TIMESTAMP
                ),
                params![&title, &artwork, &reading, id],
            )
            .map_err(|e| constraint_to_conflict(e, format!("track '{}' already exists", title)))?;

            Ok(Track {
                id,
                title,
                artwork,
                reading,
            })
        })
    }

    fn get_track(&self, id: i64) -> Result<Option<Track>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_track_inner(&conn, id)
    }

    fn find_track_by_title(&self, title: &str) -> Result<Option<Track>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id, title, artwork, reading FROM tracks WHERE title = ?1")?;
        match stmt.query_row(params![title], parse_track_row) {
            Ok(track) => Ok(Some(track)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn search_tracks(&self, q: Option<&str>) -> Result<Vec<Track>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, artwork, reading FROM tracks
             WHERE ?1 IS NULL OR title LIKE '%' || ?1 || '%'
             ORDER BY id",
        )?;
        let tracks = stmt
            .query_map(params![q], parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn delete_track(&self, id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    // =========================================================================
    // Associations
    // =========================================================================

    fn add_album_track(&self, album_id: i64, track_id: i64) -> Result<(), StoreError> {
        self.with_write_txn(|conn| {
            Self::require_album(conn, album_id)?;
            Self::require_track(conn, track_id)?;
            conn.execute(
                "INSERT INTO track_albums (track_id, album_id) VALUES (?1, ?2)",
                params![track_id, album_id],
            )
            .map_err(|e| {
                constraint_to_conflict(
                    e,
                    format!("track {} already on album {}", track_id, album_id),
                )
            })?;
            Self::touch(conn, "albums", album_id)?;
            Self::touch(conn, "tracks", track_id)?;
            Ok(())
        })
    }

    fn remove_album_track(&self, album_id: i64, track_id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let removed = conn.execute(
                "DELETE FROM track_albums WHERE track_id = ?1 AND album_id = ?2",
                params![track_id, album_id],
            )?;
            if removed > 0 {
                Self::touch(conn, "albums", album_id)?;
                Self::touch(conn, "tracks", track_id)?;
            }
            Ok(removed > 0)
        })
    }

    fn add_track_performer(&self, track_id: i64, artist_id: i64) -> Result<(), StoreError> {
        self.with_write_txn(|conn| {
            Self::require_track(conn, track_id)?;
            Self::require_artist(conn, artist_id)?;
            conn.execute(
                "INSERT INTO track_performers (track_id, artist_id) VALUES (?1, ?2)",
                params![track_id, artist_id],
            )
            .map_err(|e| {
                constraint_to_conflict(
                    e,
                    format!("artist {} already performs track {}", artist_id, track_id),
                )
            })?;
            Self::touch(conn, "tracks", track_id)?;
            Self::touch(conn, "artists", artist_id)?;
            Ok(())
        })
    }

    fn remove_track_performer(&self, track_id: i64, artist_id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let removed = conn.execute(
                "DELETE FROM track_performers WHERE track_id = ?1 AND artist_id = ?2",
                params![track_id, artist_id],
            )?;
            if removed > 0 {
                Self::touch(conn, "tracks", track_id)?;
                Self::touch(conn, "artists", artist_id)?;
            }
            Ok(removed > 0)
        })
    }

    fn add_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<(), StoreError> {
        self.with_write_txn(|conn| {
            Self::require_track(conn, track_id)?;
            Self::require_artist(conn, artist_id)?;
            conn.execute(
                "INSERT INTO track_credits (artist_id, track_id, kind) VALUES (?1, ?2, ?3)",
                params![artist_id, track_id, kind.to_db_str()],
            )
            .map_err(|e| {
                constraint_to_conflict(
                    e,
                    format!(
                        "credit ({}, {}, {}) already exists",
                        artist_id,
                        track_id,
                        kind.to_db_str()
                    ),
                )
            })?;
            Self::touch(conn, "tracks", track_id)?;
            Self::touch(conn, "artists", artist_id)?;
            Ok(())
        })
    }

    fn remove_track_credit(
        &self,
        track_id: i64,
        artist_id: i64,
        kind: CreditKind,
    ) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let removed = conn.execute(
                "DELETE FROM track_credits WHERE artist_id = ?1 AND track_id = ?2 AND kind = ?3",
                params![artist_id, track_id, kind.to_db_str()],
            )?;
            if removed > 0 {
                Self::touch(conn, "tracks", track_id)?;
                Self::touch(conn, "artists", artist_id)?;
            }
            Ok(removed > 0)
        })
    }

    fn add_artist_parent(
        &self,
        child_id: i64,
        parent_id: i64,
        kind: LineageKind,
    ) -> Result<(), StoreError> {
        self.with_write_txn(|conn| {
            Self::require_artist(conn, child_id)?;
            Self::insert_lineage(conn, parent_id, child_id, kind)?;
            Self::touch(conn, "artists", child_id)?;
            Self::touch(conn, "artists", parent_id)?;
            Ok(())
        })
    }

    fn remove_artist_parent(&self, child_id: i64, parent_id: i64) -> Result<bool, StoreError> {
        self.with_write_txn(|conn| {
            let removed = conn.execute(
                "DELETE FROM artist_lineage WHERE parent_id = ?1 AND child_id = ?2",
                params![parent_id, child_id],
            )?;
            if removed > 0 {
                Self::touch(conn, "artists", child_id)?;
                Self::touch(conn, "artists", parent_id)?;
            }
            Ok(removed > 0)
        })
    }

    // =========================================================================
    // Association Listings
    // =========================================================================

    fn track_performers(&self, track_id: i64) -> Result<Vec<Artist>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.kind, a.reading FROM artists a
             JOIN track_performers tp ON tp.artist_id = a.id
             WHERE tp.track_id = ?1 ORDER BY a.id",
        )?;
        let artists = stmt
            .query_map(params![track_id], parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn track_albums(&self, track_id: i64) -> Result<Vec<Album>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT al.id, al.title, al.artwork, al.reading FROM albums al
             JOIN track_albums ta ON ta.album_id = al.id
             WHERE ta.track_id = ?1 ORDER BY al.id",
        )?;
        let albums = stmt
            .query_map(params![track_id], parse_album_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn album_tracks(&self, album_id: i64) -> Result<Vec<Track>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id, t.title, t.artwork, t.reading FROM tracks t
             JOIN track_albums ta ON ta.track_id = t.id
             WHERE ta.album_id = ?1 ORDER BY t.id",
        )?;
        let tracks = stmt
            .query_map(params![album_id], parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn track_credits(&self, track_id: i64) -> Result<Vec<(Artist, CreditKind)>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.kind, a.reading, tc.kind FROM artists a
             JOIN track_credits tc ON tc.artist_id = a.id
             WHERE tc.track_id = ?1 ORDER BY a.id, tc.kind",
        )?;
        let credits = stmt
            .query_map(params![track_id], |row| {
                let artist = parse_artist_row(row)?;
                let kind: String = row.get(4)?;
                Ok((artist, CreditKind::from_db_str(&kind)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(credits)
    }

    fn artist_credits(&self, artist_id: i64) -> Result<Vec<(Track, CreditKind)>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id, t.title, t.artwork, t.reading, tc.kind FROM tracks t
             JOIN track_credits tc ON tc.track_id = t.id
             WHERE tc.artist_id = ?1 ORDER BY t.id, tc.kind",
        )?;
        let credits = stmt
            .query_map(params![artist_id], |row| {
                let track = parse_track_row(row)?;
                let kind: String = row.get(4)?;
                Ok((track, CreditKind::from_db_str(&kind)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(credits)
    }

    fn artist_performances(&self, artist_id: i64) -> Result<Vec<Track>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id, t.title, t.artwork, t.reading FROM tracks t
             JOIN track_performers tp ON tp.track_id = t.id
             WHERE tp.artist_id = ?1 ORDER BY t.id",
        )?;
        let tracks = stmt
            .query_map(params![artist_id], parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn artist_parents(&self, child_id: i64) -> Result<Vec<(Artist, LineageKind)>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.kind, a.reading, l.kind FROM artists a
             JOIN artist_lineage l ON l.parent_id = a.id
             WHERE l.child_id = ?1 ORDER BY a.id",
        )?;
        let parents = stmt
            .query_map(params![child_id], |row| {
                let artist = parse_artist_row(row)?;
                let kind: String = row.get(4)?;
                Ok((artist, LineageKind::from_db_str(&kind)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parents)
    }

    fn artist_children(&self, parent_id: i64) -> Result<Vec<(Artist, LineageKind)>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.kind, a.reading, l.kind FROM artists a
             JOIN artist_lineage l ON l.child_id = a.id
             WHERE l.parent_id = ?1 ORDER BY a.id",
        )?;
        let children = stmt
            .query_map(params![parent_id], |row| {
                let artist = parse_artist_row(row)?;
                let kind: String = row.get(4)?;
                Ok((artist, LineageKind::from_db_str(&kind)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(children)
    }

    // =========================================================================
    // Rebuild / Stats Support
    // =========================================================================

    fn all_artist_ids(&self) -> Result<Vec<i64>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM artists ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn all_album_ids(&self) -> Result<Vec<i64>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM albums ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn all_track_ids(&self) -> Result<Vec<i64>, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM tracks ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn artists_count(&self) -> Result<usize, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM artists", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn albums_count(&self) -> Result<usize, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM albums", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn tracks_count(&self) -> Result<usize, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn updated_since(&self, ts: i64) -> Result<UpdatedEntities, StoreError> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();

        let collect = |table: &str| -> Result<Vec<i64>, StoreError> {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT id FROM {} WHERE updated_at >= ?1 ORDER BY id",
                table
            ))?;
            let ids = stmt
                .query_map(params![ts], |r| r.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        };

        Ok(UpdatedEntities {
            artist_ids: collect("artists")?,
            album_ids: collect("albums")?,
            track_ids: collect("tracks")?,
        })
    }
}
