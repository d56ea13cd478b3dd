//! In-memory graph mirror, used by unit tests and anywhere a throwaway
//! mirror is handy. Same merge semantics as the SQLite backend, no timeout.

use super::models::{GraphEdge, GraphFragment, GraphNode, GraphOp, NodeKey};
use super::trait_def::{GraphMirror, MirrorError};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct GraphData {
    nodes: BTreeMap<NodeKey, GraphNode>,
    edges: BTreeSet<GraphEdge>,
}

#[derive(Default)]
pub struct InMemoryGraphMirror {
    inner: RwLock<GraphData>,
}

impl InMemoryGraphMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphMirror for InMemoryGraphMirror {
    fn apply(&self, ops: &[GraphOp]) -> Result<(), MirrorError> {
        let mut data = self.inner.write().unwrap();
        for op in ops {
            match op {
                GraphOp::MergeNode(node) => {
                    data.nodes.insert(node.key, node.clone());
                }
                GraphOp::MergeEdge(edge) => {
                    data.edges.insert(*edge);
                }
                GraphOp::DeleteEdge(edge) => {
                    data.edges.remove(edge);
                }
            }
        }
        Ok(())
    }

    fn expand(&self, seed: &NodeKey, hops: u32) -> Result<Option<GraphFragment>, MirrorError> {
        let data = self.inner.read().unwrap();

        let seed_node = match data.nodes.get(seed) {
            Some(node) => node.clone(),
            None => return Ok(None),
        };

        let mut nodes: BTreeMap<NodeKey, GraphNode> = BTreeMap::new();
        nodes.insert(*seed, seed_node);
        let mut edges: BTreeSet<GraphEdge> = BTreeSet::new();
        let mut visited: HashSet<NodeKey> = HashSet::new();
        visited.insert(*seed);
        let mut frontier = vec![*seed];

        for _ in 0..hops {
            let mut next_frontier = Vec::new();
            for key in &frontier {
                let incident = data
                    .edges
                    .iter()
                    .filter(|e| e.source == *key || e.target == *key);
                for edge in incident {
                    edges.insert(*edge);
                    let other = if edge.source == *key {
                        edge.target
                    } else {
                        edge.source
                    };
                    if visited.insert(other) {
                        next_frontier.push(other);
                        if let Some(node) = data.nodes.get(&other) {
                            nodes.insert(other, node.clone());
                        }
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(Some(GraphFragment {
            nodes: nodes.into_values().collect(),
            edges: edges.into_iter().collect(),
        }))
    }

    fn clear(&self) -> Result<(), MirrorError> {
        let mut data = self.inner.write().unwrap();
        data.nodes.clear();
        data.edges.clear();
        Ok(())
    }

    fn node_count(&self) -> Result<usize, MirrorError> {
        Ok(self.inner.read().unwrap().nodes.len())
    }

    fn edge_count(&self) -> Result<usize, MirrorError> {
        Ok(self.inner.read().unwrap().edges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_mirror::models::{EdgeKind, NodeLabel};

    fn node(label: NodeLabel, id: i64) -> GraphNode {
        GraphNode {
            key: NodeKey { label, id },
            name: Some(format!("{}-{}", label.to_db_str(), id)),
            title: None,
            reading: None,
            kind: None,
        }
    }

    #[test]
    fn merge_then_delete_edge() {
        let mirror = InMemoryGraphMirror::new();
        let edge = GraphEdge {
            source: NodeKey::track(1),
            target: NodeKey::artist(1),
            kind: EdgeKind::By,
        };
        mirror
            .apply(&[
                GraphOp::MergeNode(node(NodeLabel::Track, 1)),
                GraphOp::MergeNode(node(NodeLabel::Artist, 1)),
                GraphOp::MergeEdge(edge),
                GraphOp::MergeEdge(edge),
            ])
            .unwrap();
        assert_eq!(mirror.edge_count().unwrap(), 1);

        mirror.apply(&[GraphOp::DeleteEdge(edge)]).unwrap();
        assert_eq!(mirror.edge_count().unwrap(), 0);
        assert_eq!(mirror.node_count().unwrap(), 2);
    }

    #[test]
    fn isolated_seed_expands_to_itself() {
        let mirror = InMemoryGraphMirror::new();
        mirror
            .apply(&[GraphOp::MergeNode(node(NodeLabel::Artist, 1))])
            .unwrap();
        let fragment = mirror.expand(&NodeKey::artist(1), 2).unwrap().unwrap();
        assert_eq!(fragment.nodes.len(), 1);
        assert!(fragment.edges.is_empty());
    }
}
