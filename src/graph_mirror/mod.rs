//! Derived property-graph mirror of the catalog.
//!
//! The mirror is never authoritative: it can be cleared and rebuilt from the
//! entity store at any time, and it may lag behind it when mirror writes
//! fail. Consumers treat anything read from here as a hint to be re-checked
//! against the entity store.

mod memory;
mod models;
mod sqlite;
mod trait_def;

pub use memory::InMemoryGraphMirror;
pub use models::{EdgeKind, GraphEdge, GraphFragment, GraphNode, GraphOp, NodeKey, NodeLabel};
pub use sqlite::SqliteGraphMirror;
pub use trait_def::{GraphMirror, MirrorError};
