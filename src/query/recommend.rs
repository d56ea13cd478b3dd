//! Shared-track artist recommendations.
//!
//! Candidates are artists that contributed to at least one of the seed
//! artist's tracks. Each candidate is scored by how many tracks it shares
//! with the seed, normalized by the size of the union of both artists'
//! immediate neighborhoods, so prolific artists don't dominate just by
//! touching everything.

use crate::graph_mirror::{GraphEdge, GraphMirror, MirrorError, NodeKey, NodeLabel};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// An artist-to-track contribution edge, regardless of which endpoint the
/// edge starts from.
fn contribution_endpoints(edge: &GraphEdge) -> Option<(NodeKey, NodeKey)> {
    if !edge.kind.is_contribution() {
        return None;
    }
    match (edge.source.label, edge.target.label) {
        (NodeLabel::Track, NodeLabel::Artist) => Some((edge.source, edge.target)),
        (NodeLabel::Artist, NodeLabel::Track) => Some((edge.target, edge.source)),
        _ => None,
    }
}

/// Immediate neighbors of `key` over every edge kind, both directions.
fn immediate_neighbors(
    mirror: &dyn GraphMirror,
    key: &NodeKey,
) -> Result<HashSet<NodeKey>, MirrorError> {
    let mut neighbors = HashSet::new();
    if let Some(fragment) = mirror.expand(key, 1)? {
        for edge in &fragment.edges {
            let other = if edge.source == *key {
                edge.target
            } else {
                edge.source
            };
            neighbors.insert(other);
        }
    }
    Ok(neighbors)
}

/// Rank artists related to `artist_id` by shared-track overlap. Returns
/// ranked artist ids; score descending, ties broken by ascending id. An
/// unmirrored or isolated artist gets an empty ranking.
pub fn recommend(
    mirror: &dyn GraphMirror,
    artist_id: i64,
    limit: usize,
) -> Result<Vec<i64>, MirrorError> {
    let seed = NodeKey::artist(artist_id);
    let Some(fragment) = mirror.expand(&seed, 2)? else {
        return Ok(Vec::new());
    };

    // Hop 1: the seed's tracks. Hop 2: other artists on those tracks.
    let mut seed_tracks: HashSet<NodeKey> = HashSet::new();
    for edge in &fragment.edges {
        if let Some((track, artist)) = contribution_endpoints(edge) {
            if artist == seed {
                seed_tracks.insert(track);
            }
        }
    }

    let mut shared_tracks: HashMap<i64, HashSet<NodeKey>> = HashMap::new();
    for edge in &fragment.edges {
        if let Some((track, artist)) = contribution_endpoints(edge) {
            if artist != seed && seed_tracks.contains(&track) {
                shared_tracks.entry(artist.id).or_default().insert(track);
            }
        }
    }

    let seed_neighbors = immediate_neighbors(mirror, &seed)?;

    let mut scored: Vec<(i64, f64)> = Vec::with_capacity(shared_tracks.len());
    for (candidate_id, tracks) in shared_tracks {
        let candidate_neighbors =
            immediate_neighbors(mirror, &NodeKey::artist(candidate_id))?;
        let overlap = seed_neighbors.union(&candidate_neighbors).count();
        if overlap == 0 {
            continue;
        }
        scored.push((candidate_id, tracks.len() as f64 / overlap as f64));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(limit);

    Ok(scored.into_iter().map(|(id, _)| id).collect())
}
