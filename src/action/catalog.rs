use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ActionKind, SearchType};

// ── Parameter structs (schema only) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchAndPlayParams {
    /// Free-text catalog query, at most 120 characters.
    pub query: String,
    #[serde(rename = "type", default)]
    pub search_type: SearchType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArtistTopTracksParams {
    /// Artist name, at most 80 characters.
    #[serde(rename = "artistName")]
    pub artist_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MyPlaylistParams {
    /// Case-insensitive fragment of one of the user's playlist names, at most 80 characters.
    #[serde(rename = "playlistName")]
    pub playlist_name: String,
}

// ── Catalog ─────────────────────────────────────────────────────

/// A catalog entry: action metadata + JSON schema for the params.
#[derive(Debug, Clone, Serialize)]
pub struct ActionCatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub param_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

fn schema_value<T: JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or(empty_object_schema())
}

fn param_schema(kind: ActionKind) -> Value {
    match kind {
        ActionKind::Play | ActionKind::Pause | ActionKind::Next | ActionKind::Previous => {
            empty_object_schema()
        }
        ActionKind::SearchAndPlay => schema_value::<SearchAndPlayParams>(),
        ActionKind::PlayArtistTopTracks => schema_value::<ArtistTopTracksParams>(),
        ActionKind::PlayMyPlaylist => schema_value::<MyPlaylistParams>(),
    }
}

/// Every allowed action with its parameter schema, in declaration order.
pub fn action_catalog() -> Vec<ActionCatalogEntry> {
    ActionKind::all()
        .iter()
        .map(|kind| ActionCatalogEntry {
            name: kind.slug(),
            description: kind.description(),
            param_schema: param_schema(*kind),
        })
        .collect()
}
