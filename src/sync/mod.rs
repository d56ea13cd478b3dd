//! Mirroring of entity-store commits into the graph mirror.
//!
//! The relational commit always happens first; mirroring is best-effort and
//! idempotent, so a failed or repeated mirror write never corrupts anything,
//! it only lags. A full rebuild or a watermark resync catches the mirror up.

mod commit;
mod coordinator;

pub use commit::{album_commit, artist_commit, track_commit, CommitAssociation, EntityCommit};
pub use coordinator::{RebuildStats, SyncCoordinator, SyncError};
