//! Two-hop relationship neighborhood in trimmed wire shape.

use crate::graph_mirror::{GraphMirror, MirrorError, NodeKey};
use serde::{Deserialize, Serialize};

/// Node in the trimmed payload. `group_id` is the entity label
/// (`"Artist"`), `id` the graph-native id (`"Artist:42"`, matching edge
/// endpoints), `label` the display text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedNode {
    #[serde(rename = "groupId")]
    pub group_id: String,
    pub id: String,
    pub label: String,
}

/// Edge in the trimmed payload; endpoints are graph-native ids, the label
/// is the edge kind's wire name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Deduplicated 2-hop neighborhood of a seed node. Order is not guaranteed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub nodes: Vec<TrimmedNode>,
    pub edges: Vec<TrimmedEdge>,
}

/// Expand two hops around `seed` and trim the fragment for the wire.
/// `None` when the seed is not mirrored; a seed with no relationships yields
/// itself with no edges. A timeout fails the whole query.
pub fn neighborhood(
    mirror: &dyn GraphMirror,
    seed: &NodeKey,
) -> Result<Option<Neighborhood>, MirrorError> {
    let Some(fragment) = mirror.expand(seed, 2)? else {
        return Ok(None);
    };

    let nodes = fragment
        .nodes
        .iter()
        .map(|node| TrimmedNode {
            group_id: node.key.label.to_db_str().to_string(),
            id: node.key.graph_id(),
            label: node.display_label(),
        })
        .collect();
    let edges = fragment
        .edges
        .iter()
        .map(|edge| TrimmedEdge {
            source: edge.source.graph_id(),
            target: edge.target.graph_id(),
            label: edge.kind.to_db_str().to_string(),
        })
        .collect();

    Ok(Some(Neighborhood { nodes, edges }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_mirror::{EdgeKind, GraphEdge, GraphNode, GraphOp, InMemoryGraphMirror};

    fn merge_artist(mirror: &InMemoryGraphMirror, id: i64, name: &str) {
        mirror
            .apply(&[GraphOp::MergeNode(GraphNode {
                key: NodeKey::artist(id),
                name: Some(name.into()),
                title: None,
                reading: None,
                kind: None,
            })])
            .unwrap();
    }

    fn merge_track(mirror: &InMemoryGraphMirror, id: i64, title: &str) {
        mirror
            .apply(&[GraphOp::MergeNode(GraphNode {
                key: NodeKey::track(id),
                name: None,
                title: Some(title.into()),
                reading: None,
                kind: None,
            })])
            .unwrap();
    }

    #[test]
    fn unmirrored_seed_is_none() {
        let mirror = InMemoryGraphMirror::new();
        assert!(neighborhood(&mirror, &NodeKey::artist(1)).unwrap().is_none());
    }

    #[test]
    fn lonely_seed_yields_itself() {
        let mirror = InMemoryGraphMirror::new();
        merge_artist(&mirror, 1, "Solo");
        let result = neighborhood(&mirror, &NodeKey::artist(1)).unwrap().unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].group_id, "Artist");
        assert_eq!(result.nodes[0].id, "Artist:1");
        assert_eq!(result.nodes[0].label, "Solo");
        assert!(result.edges.is_empty());
    }

    #[test]
    fn trimmed_shapes_use_wire_names() {
        let mirror = InMemoryGraphMirror::new();
        merge_artist(&mirror, 1, "A");
        merge_track(&mirror, 2, "T");
        mirror
            .apply(&[GraphOp::MergeEdge(GraphEdge {
                source: NodeKey::track(2),
                target: NodeKey::artist(1),
                kind: EdgeKind::By,
            })])
            .unwrap();

        let result = neighborhood(&mirror, &NodeKey::artist(1)).unwrap().unwrap();
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].source, "Track:2");
        assert_eq!(result.edges[0].target, "Artist:1");
        assert_eq!(result.edges[0].label, "BY");
        // The track node falls back to its title for the display label
        let track = result.nodes.iter().find(|n| n.id == "Track:2").unwrap();
        assert_eq!(track.group_id, "Track");
        assert_eq!(track.label, "T");

        let json = serde_json::to_value(&result.nodes[0]).unwrap();
        assert!(json.get("groupId").is_some());
    }
}
