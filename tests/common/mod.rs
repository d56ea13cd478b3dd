#![allow(dead_code)]

use melodex::catalog::CatalogService;
use melodex::entity_store::{Artist, ArtistKind, NewArtist, NewTrack, SqliteEntityStore, Track};
use melodex::graph_mirror::{
    GraphFragment, GraphMirror, GraphOp, MirrorError, NodeKey, SqliteGraphMirror,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// A full dual-store catalog backed by temp-dir SQLite files.
pub struct TestCatalog {
    pub service: CatalogService,
    pub store: Arc<SqliteEntityStore>,
    pub mirror: Arc<SqliteGraphMirror>,
    _tmp: TempDir,
}

pub fn test_catalog() -> TestCatalog {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(SqliteEntityStore::new(tmp.path().join("entities.db"), 2).unwrap());
    let mirror = Arc::new(
        SqliteGraphMirror::new(tmp.path().join("graph.db"), 2, TEST_QUERY_TIMEOUT).unwrap(),
    );
    let service = CatalogService::new(store.clone(), mirror.clone());
    TestCatalog {
        service,
        store,
        mirror,
        _tmp: tmp,
    }
}

/// Mirror stub whose every call fails, for failure-isolation tests.
pub struct FailingGraphMirror;

impl GraphMirror for FailingGraphMirror {
    fn apply(&self, _ops: &[GraphOp]) -> Result<(), MirrorError> {
        Err(MirrorError::Unavailable("mirror down".into()))
    }

    fn expand(&self, _seed: &NodeKey, _hops: u32) -> Result<Option<GraphFragment>, MirrorError> {
        Err(MirrorError::Unavailable("mirror down".into()))
    }

    fn clear(&self) -> Result<(), MirrorError> {
        Err(MirrorError::Unavailable("mirror down".into()))
    }

    fn node_count(&self) -> Result<usize, MirrorError> {
        Err(MirrorError::Unavailable("mirror down".into()))
    }

    fn edge_count(&self) -> Result<usize, MirrorError> {
        Err(MirrorError::Unavailable("mirror down".into()))
    }
}

/// A catalog whose mirror rejects every write.
pub fn catalog_with_failing_mirror() -> (CatalogService, Arc<SqliteEntityStore>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(SqliteEntityStore::new(tmp.path().join("entities.db"), 2).unwrap());
    let service = CatalogService::new(store.clone(), Arc::new(FailingGraphMirror));
    (service, store, tmp)
}

pub fn new_artist(name: &str) -> NewArtist {
    NewArtist {
        name: name.to_string(),
        kind: ArtistKind::Individual,
        reading: None,
        parents: vec![],
    }
}

pub fn create_artist(service: &CatalogService, name: &str) -> Artist {
    service.create_artist(&new_artist(name)).unwrap()
}

pub fn create_track(service: &CatalogService, title: &str, artist_ids: &[i64]) -> Track {
    service
        .create_track(&NewTrack {
            title: title.to_string(),
            artist_ids: artist_ids.to_vec(),
            ..Default::default()
        })
        .unwrap()
}
