//! The closed set of playback actions and their parameter schema.
//!
//! `StructuredAction` is the typed form the executor consumes. Its wire form
//! is the flat `{ "action": ..., "parameters": { ... } }` record that the
//! model is asked to produce and that the API echoes back.

pub mod catalog;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use ts_rs::TS;

/// Maximum length (in chars) of a free-text search query.
pub const QUERY_MAX_CHARS: usize = 120;
/// Maximum length (in chars) of an artist or playlist name.
pub const NAME_MAX_CHARS: usize = 80;

pub const PARAM_QUERY: &str = "query";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_ARTIST_NAME: &str = "artistName";
pub const PARAM_PLAYLIST_NAME: &str = "playlistName";

// ── Action kinds ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ActionKind {
    Play,
    Pause,
    Next,
    Previous,
    SearchAndPlay,
    PlayArtistTopTracks,
    PlayMyPlaylist,
}

/// How a string parameter is normalized by the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRule {
    /// Trimmed free text, capped at `max_chars`.
    Text { max_chars: usize },
    /// One of the `SearchType` slugs; anything else becomes `track`.
    SearchType,
}

/// One schema-defined parameter key of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub rule: ParamRule,
}

const NO_PARAMS: &[ParamSpec] = &[];

const SEARCH_AND_PLAY_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        key: PARAM_QUERY,
        rule: ParamRule::Text {
            max_chars: QUERY_MAX_CHARS,
        },
    },
    ParamSpec {
        key: PARAM_TYPE,
        rule: ParamRule::SearchType,
    },
];

const ARTIST_PARAMS: &[ParamSpec] = &[ParamSpec {
    key: PARAM_ARTIST_NAME,
    rule: ParamRule::Text {
        max_chars: NAME_MAX_CHARS,
    },
}];

const PLAYLIST_PARAMS: &[ParamSpec] = &[ParamSpec {
    key: PARAM_PLAYLIST_NAME,
    rule: ParamRule::Text {
        max_chars: NAME_MAX_CHARS,
    },
}];

impl ActionKind {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::SearchAndPlay => "search_and_play",
            Self::PlayArtistTopTracks => "play_artist_top_tracks",
            Self::PlayMyPlaylist => "play_my_playlist",
        }
    }

    /// Exact slug lookup. Leading/trailing whitespace and ASCII case are ignored.
    pub fn from_slug(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.slug().eq_ignore_ascii_case(s))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Play => "Resume playback on the active device",
            Self::Pause => "Pause playback",
            Self::Next => "Skip to the next track",
            Self::Previous => "Go back to the previous track",
            Self::SearchAndPlay => "Search the catalog and play the first track, artist or playlist found",
            Self::PlayArtistTopTracks => "Play the top tracks of an artist",
            Self::PlayMyPlaylist => "Play one of the user's own playlists, matched by name",
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Play | Self::Pause | Self::Next | Self::Previous => NO_PARAMS,
            Self::SearchAndPlay => SEARCH_AND_PLAY_PARAMS,
            Self::PlayArtistTopTracks => ARTIST_PARAMS,
            Self::PlayMyPlaylist => PLAYLIST_PARAMS,
        }
    }

    pub fn all() -> &'static [ActionKind] {
        &[
            Self::Play,
            Self::Pause,
            Self::Next,
            Self::Previous,
            Self::SearchAndPlay,
            Self::PlayArtistTopTracks,
            Self::PlayMyPlaylist,
        ]
    }
}

// ── Search type ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SearchType {
    #[default]
    Track,
    Artist,
    Playlist,
}

impl SearchType {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "track" => Some(Self::Track),
            "artist" => Some(Self::Artist),
            "playlist" => Some(Self::Playlist),
            _ => None,
        }
    }

    /// Key of the result page in a catalog search response (`tracks`, ...).
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Track => "tracks",
            Self::Artist => "artists",
            Self::Playlist => "playlists",
        }
    }
}

// ── Structured action ────────────────────────────────────────────

/// A validated playback action. Only the sanitizer and the heuristic rules
/// build these; the executor consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredAction {
    Play,
    Pause,
    Next,
    Previous,
    SearchAndPlay {
        query: String,
        search_type: SearchType,
    },
    PlayArtistTopTracks {
        artist_name: String,
    },
    PlayMyPlaylist {
        playlist_name: String,
    },
}

impl StructuredAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Play => ActionKind::Play,
            Self::Pause => ActionKind::Pause,
            Self::Next => ActionKind::Next,
            Self::Previous => ActionKind::Previous,
            Self::SearchAndPlay { .. } => ActionKind::SearchAndPlay,
            Self::PlayArtistTopTracks { .. } => ActionKind::PlayArtistTopTracks,
            Self::PlayMyPlaylist { .. } => ActionKind::PlayMyPlaylist,
        }
    }

    /// Parameters keyed by their wire names, in schema order.
    pub fn parameters(&self) -> IndexMap<&'static str, String> {
        let mut params = IndexMap::new();
        match self {
            Self::Play | Self::Pause | Self::Next | Self::Previous => {}
            Self::SearchAndPlay { query, search_type } => {
                params.insert(PARAM_QUERY, query.clone());
                params.insert(PARAM_TYPE, search_type.slug().to_string());
            }
            Self::PlayArtistTopTracks { artist_name } => {
                params.insert(PARAM_ARTIST_NAME, artist_name.clone());
            }
            Self::PlayMyPlaylist { playlist_name } => {
                params.insert(PARAM_PLAYLIST_NAME, playlist_name.clone());
            }
        }
        params
    }

    pub fn to_record(&self) -> ActionRecord {
        ActionRecord {
            action: self.kind(),
            parameters: self
                .parameters()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// The untyped `{action, parameters}` JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_record()).unwrap_or(Value::Null)
    }

    /// Human-readable summary for logs and CLI output.
    pub fn description(&self) -> String {
        match self {
            Self::Play => "Resume playback".to_string(),
            Self::Pause => "Pause playback".to_string(),
            Self::Next => "Skip to next track".to_string(),
            Self::Previous => "Back to previous track".to_string(),
            Self::SearchAndPlay { query, search_type } => {
                format!("Play {} \"{query}\"", search_type.slug())
            }
            Self::PlayArtistTopTracks { artist_name } => {
                format!("Play top tracks by \"{artist_name}\"")
            }
            Self::PlayMyPlaylist { playlist_name } => {
                format!("Play my playlist \"{playlist_name}\"")
            }
        }
    }
}

impl Serialize for StructuredAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Wire form of a `StructuredAction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActionRecord {
    pub action: ActionKind,
    pub parameters: BTreeMap<String, String>,
}
