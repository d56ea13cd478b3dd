//! Catalog entity models for the relational store.

use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

/// Whether an artist is a single person or a group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ArtistKind {
    Individual,
    Group,
}

impl ArtistKind {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "GROUP" => ArtistKind::Group,
            _ => ArtistKind::Individual,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ArtistKind::Individual => "INDIVIDUAL",
            ArtistKind::Group => "GROUP",
        }
    }
}

/// Artist credit on a track.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CreditKind {
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
}

impl CreditKind {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "PRODUCER" => CreditKind::Producer,
            "WRITER" => CreditKind::Writer,
            "COMPOSER" => CreditKind::Composer,
            "ARRANGER" => CreditKind::Arranger,
            "PERFORMER" => CreditKind::Performer,
            "MIXER" => CreditKind::Mixer,
            "MASTERER" => CreditKind::Masterer,
            "ENGINEER" => CreditKind::Engineer,
            "LYRICIST" => CreditKind::Lyricist,
            _ => CreditKind::Other,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CreditKind::Producer => "PRODUCER",
            CreditKind::Writer => "WRITER",
            CreditKind::Composer => "COMPOSER",
            CreditKind::Arranger => "ARRANGER",
            CreditKind::Performer => "PERFORMER",
            CreditKind::Mixer => "MIXER",
            CreditKind::Masterer => "MASTERER",
            CreditKind::Engineer => "ENGINEER",
            CreditKind::Lyricist => "LYRICIST",
            CreditKind::Other => "OTHER",
        }
    }
}

/// Artist-to-artist lineage: a group consists of its members, a character
/// is voiced by a performer. Edges run parent to child.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LineageKind {
    ConsistOf,
    VoicedBy,
}

impl LineageKind {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "VOICED_BY" => LineageKind::VoicedBy,
            _ => LineageKind::ConsistOf,
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineageKind::ConsistOf => "CONSIST_OF",
            LineageKind::VoicedBy => "VOICED_BY",
        }
    }
}

// =============================================================================
// Core Entities
// =============================================================================

/// Artist entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub kind: ArtistKind,
    /// Phonetic reading of the name, where one exists.
    pub reading: Option<String>,
}

/// Album entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub artwork: Option<String>,
    pub reading: Option<String>,
}

/// Track entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artwork: Option<String>,
    pub reading: Option<String>,
}

// =============================================================================
// Command Objects
// =============================================================================

/// A parent artist reference supplied at artist creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineageRef {
    pub artist_id: i64,
    pub kind: LineageKind,
}

#[derive(Clone, Debug, Default)]
pub struct NewArtist {
    pub name: String,
    pub kind: ArtistKind,
    pub reading: Option<String>,
    pub parents: Vec<LineageRef>,
}

#[derive(Clone, Debug, Default)]
pub struct ArtistPatch {
    pub name: Option<String>,
    pub reading: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewAlbum {
    pub title: String,
    pub artwork: Option<String>,
    pub reading: Option<String>,
    pub track_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct AlbumPatch {
    pub title: Option<String>,
    pub artwork: Option<String>,
    pub reading: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewTrack {
    pub title: String,
    pub artwork: Option<String>,
    pub reading: Option<String>,
    /// Performing artists (BY edges in the mirror).
    pub artist_ids: Vec<i64>,
    pub album_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub artwork: Option<String>,
    pub reading: Option<String>,
}

impl Default for ArtistKind {
    fn default() -> Self {
        ArtistKind::Individual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_kind_db_str_roundtrip() {
        let kinds = vec![
            CreditKind::Producer,
            CreditKind::Writer,
            CreditKind::Composer,
            CreditKind::Arranger,
            CreditKind::Performer,
            CreditKind::Mixer,
            CreditKind::Masterer,
            CreditKind::Engineer,
            CreditKind::Lyricist,
            CreditKind::Other,
        ];
        for kind in kinds {
            assert_eq!(kind, CreditKind::from_db_str(kind.to_db_str()));
        }
    }

    #[test]
    fn unknown_credit_maps_to_other() {
        assert_eq!(CreditKind::from_db_str("GAFFER"), CreditKind::Other);
    }

    #[test]
    fn lineage_kind_db_str_roundtrip() {
        assert_eq!(LineageKind::ConsistOf.to_db_str(), "CONSIST_OF");
        assert_eq!(LineageKind::VoicedBy.to_db_str(), "VOICED_BY");
        assert_eq!(
            LineageKind::from_db_str("VOICED_BY"),
            LineageKind::VoicedBy
        );
    }
}
