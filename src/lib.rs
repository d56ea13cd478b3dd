//! Melodex catalog core.
//!
//! An authoritative relational entity store for artists, albums and tracks,
//! a derived property-graph mirror, and the sync, query and recommendation
//! machinery between them.

pub mod catalog;
pub mod config;
pub mod entity_store;
pub mod graph_mirror;
pub mod query;
pub mod sqlite_persistence;
pub mod sync;

// Re-export commonly used types for convenience
pub use catalog::{CatalogError, CatalogService, CatalogStats};
pub use entity_store::{EntityStore, SqliteEntityStore, StoreError};
pub use graph_mirror::{GraphMirror, InMemoryGraphMirror, MirrorError, SqliteGraphMirror};
pub use sync::{SyncCoordinator, SyncError};
