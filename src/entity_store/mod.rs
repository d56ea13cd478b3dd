//! Authoritative relational store for artists, albums, tracks and their
//! associations. Owns identity (integer surrogate keys) and uniqueness
//! constraints; the graph mirror is derived from it and never the other
//! way around.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    Album, AlbumPatch, Artist, ArtistKind, ArtistPatch, CreditKind, LineageKind, LineageRef,
    NewAlbum, NewArtist, NewTrack, Track, TrackPatch,
};
pub use store::SqliteEntityStore;
pub use trait_def::{EntityStore, StoreError, UpdatedEntities};
