//! Graph mirror models.

use crate::entity_store::{Album, Artist, CreditKind, LineageKind, Track};
use serde::{Deserialize, Serialize};

/// Node label, one per entity kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Artist,
    Album,
    Track,
}

impl NodeLabel {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Album" => NodeLabel::Album,
            "Track" => NodeLabel::Track,
            _ => NodeLabel::Artist,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            NodeLabel::Artist => "Artist",
            NodeLabel::Album => "Album",
            NodeLabel::Track => "Track",
        }
    }
}

/// The merge key of a mirrored node. Two writes with the same key address
/// the same node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub id: i64,
}

impl NodeKey {
    pub fn artist(id: i64) -> Self {
        NodeKey {
            label: NodeLabel::Artist,
            id,
        }
    }

    pub fn album(id: i64) -> Self {
        NodeKey {
            label: NodeLabel::Album,
            id,
        }
    }

    pub fn track(id: i64) -> Self {
        NodeKey {
            label: NodeLabel::Track,
            id,
        }
    }

    /// Graph-native id, e.g. `Artist:42`. Used as source/target in trimmed
    /// query payloads.
    pub fn graph_id(&self) -> String {
        format!("{}:{}", self.label.to_db_str(), self.id)
    }
}

/// A mirrored node: merge key plus display properties. Artists carry `name`
/// and `kind`; albums and tracks carry `title`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub key: NodeKey,
    pub name: Option<String>,
    pub title: Option<String>,
    pub reading: Option<String>,
    pub kind: Option<String>,
}

impl GraphNode {
    /// Display label for trimmed payloads: `name` when present, else `title`.
    pub fn display_label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_default()
    }
}

impl From<&Artist> for GraphNode {
    fn from(artist: &Artist) -> Self {
        GraphNode {
            key: NodeKey::artist(artist.id),
            name: Some(artist.name.clone()),
            title: None,
            reading: artist.reading.clone(),
            kind: Some(artist.kind.to_db_str().to_string()),
        }
    }
}

impl From<&Album> for GraphNode {
    fn from(album: &Album) -> Self {
        GraphNode {
            key: NodeKey::album(album.id),
            name: None,
            title: Some(album.title.clone()),
            reading: album.reading.clone(),
            kind: None,
        }
    }
}

impl From<&Track> for GraphNode {
    fn from(track: &Track) -> Self {
        GraphNode {
            key: NodeKey::track(track.id),
            name: None,
            title: Some(track.title.clone()),
            reading: track.reading.clone(),
            kind: None,
        }
    }
}

/// Closed set of relationship kinds mirrored into the graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Track -> Album membership
    TrackOf,
    /// Track -> performing Artist
    By,
    Producer,
    Writer,
    Composer,
    Arranger,
    Performer,
    Mixer,
    Masterer,
    Engineer,
    Lyricist,
    Other,
    /// Parent group -> member artist
    ConsistOf,
    /// Character -> voice artist
    VoicedBy,
}

impl EdgeKind {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "TRACK_OF" => EdgeKind::TrackOf,
            "BY" => EdgeKind::By,
            "PRODUCER" => EdgeKind::Producer,
            "WRITER" => EdgeKind::Writer,
            "COMPOSER" => EdgeKind::Composer,
            "ARRANGER" => EdgeKind::Arranger,
            "PERFORMER" => EdgeKind::Performer,
            "MIXER" => EdgeKind::Mixer,
            "MASTERER" => EdgeKind::Masterer,
            "ENGINEER" => EdgeKind::Engineer,
            "LYRICIST" => EdgeKind::Lyricist,
            "CONSIST_OF" => EdgeKind::ConsistOf,
            "VOICED_BY" => EdgeKind::VoicedBy,
            _ => EdgeKind::Other,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EdgeKind::TrackOf => "TRACK_OF",
            EdgeKind::By => "BY",
            EdgeKind::Producer => "PRODUCER",
            EdgeKind::Writer => "WRITER",
            EdgeKind::Composer => "COMPOSER",
            EdgeKind::Arranger => "ARRANGER",
            EdgeKind::Performer => "PERFORMER",
            EdgeKind::Mixer => "MIXER",
            EdgeKind::Masterer => "MASTERER",
            EdgeKind::Engineer => "ENGINEER",
            EdgeKind::Lyricist => "LYRICIST",
            EdgeKind::Other => "OTHER",
            EdgeKind::ConsistOf => "CONSIST_OF",
            EdgeKind::VoicedBy => "VOICED_BY",
        }
    }

    /// True for the kinds that connect an artist to a track they worked on,
    /// i.e. the edges the recommendation engine treats as "shares a track".
    pub fn is_contribution(&self) -> bool {
        !matches!(self, EdgeKind::TrackOf | EdgeKind::ConsistOf | EdgeKind::VoicedBy)
    }
}

impl From<CreditKind> for EdgeKind {
    fn from(kind: CreditKind) -> Self {
        match kind {
            CreditKind::Producer => EdgeKind::Producer,
            CreditKind::Writer => EdgeKind::Writer,
            CreditKind::Composer => EdgeKind::Composer,
            CreditKind::Arranger => EdgeKind::Arranger,
            CreditKind::Performer => EdgeKind::Performer,
            CreditKind::Mixer => EdgeKind::Mixer,
            CreditKind::Masterer => EdgeKind::Masterer,
            CreditKind::Engineer => EdgeKind::Engineer,
            CreditKind::Lyricist => EdgeKind::Lyricist,
            CreditKind::Other => EdgeKind::Other,
        }
    }
}

impl From<LineageKind> for EdgeKind {
    fn from(kind: LineageKind) -> Self {
        match kind {
            LineageKind::ConsistOf => EdgeKind::ConsistOf,
            LineageKind::VoicedBy => EdgeKind::VoicedBy,
        }
    }
}

/// A directed, kinded edge. At most one edge per (source, kind, target).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeKey,
    pub target: NodeKey,
    pub kind: EdgeKind,
}

/// The mirror's whole write surface.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphOp {
    MergeNode(GraphNode),
    MergeEdge(GraphEdge),
    DeleteEdge(GraphEdge),
}

/// Deduplicated result of a bounded traversal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphFragment {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
