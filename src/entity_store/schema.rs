//! SQLite schema for the authoritative catalog database.
//!
//! Entity ids are integer surrogate keys assigned by SQLite. Natural keys
//! (artist name, album/track title) carry unique constraints; junction
//! tables carry composite uniqueness so an association can exist at most
//! once per (endpoints, kind).

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Entity Tables
// =============================================================================

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("kind", SqlType::Text, non_null = true), // 'INDIVIDUAL' | 'GROUP'
        sqlite_column!("reading", SqlType::Text),
        sqlite_column!(
            "updated_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_artists_updated", "updated_at")],
    unique_constraints: &[&["name"]],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artwork", SqlType::Text),
        sqlite_column!("reading", SqlType::Text),
        sqlite_column!(
            "updated_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_albums_updated", "updated_at")],
    unique_constraints: &[&["title"]],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artwork", SqlType::Text),
        sqlite_column!("reading", SqlType::Text),
        sqlite_column!(
            "updated_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracks_updated", "updated_at")],
    unique_constraints: &[&["title"]],
};

// =============================================================================
// Junction Tables
// =============================================================================

/// Track <-> Album membership (TRACK_OF)
const TRACK_ALBUMS_TABLE: Table = Table {
    name: "track_albums",
    columns: &[
        sqlite_column!(
            "track_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!(
            "album_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
    ],
    indices: &[
        ("idx_track_albums_track", "track_id"),
        ("idx_track_albums_album", "album_id"),
    ],
    unique_constraints: &[&["track_id", "album_id"]],
};

/// Track <-> performing Artist (BY)
const TRACK_PERFORMERS_TABLE: Table = Table {
    name: "track_performers",
    columns: &[
        sqlite_column!(
            "track_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!(
            "artist_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
    ],
    indices: &[
        ("idx_track_performers_track", "track_id"),
        ("idx_track_performers_artist", "artist_id"),
    ],
    unique_constraints: &[&["track_id", "artist_id"]],
};

/// Artist credit on a track, at most one per (artist, track, kind)
const TRACK_CREDITS_TABLE: Table = Table {
    name: "track_credits",
    columns: &[
        sqlite_column!(
            "artist_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "track_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!("kind", SqlType::Text, non_null = true), // 'PRODUCER', 'WRITER', ...
    ],
    indices: &[
        ("idx_track_credits_artist", "artist_id"),
        ("idx_track_credits_track", "track_id"),
    ],
    unique_constraints: &[&["artist_id", "track_id", "kind"]],
};

/// Artist parent/child lineage (CONSIST_OF, VOICED_BY), parent -> child
const ARTIST_LINEAGE_TABLE: Table = Table {
    name: "artist_lineage",
    columns: &[
        sqlite_column!(
            "parent_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "child_id",
            SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!("kind", SqlType::Text, non_null = true), // 'CONSIST_OF' | 'VOICED_BY'
    ],
    indices: &[
        ("idx_artist_lineage_parent", "parent_id"),
        ("idx_artist_lineage_child", "child_id"),
    ],
    unique_constraints: &[&["parent_id", "child_id"]],
};

pub const ENTITY_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        TRACK_ALBUMS_TABLE,
        TRACK_PERFORMERS_TABLE,
        TRACK_CREDITS_TABLE,
        ARTIST_LINEAGE_TABLE,
    ],
    migration: None,
};
