//! The media-control boundary: the four operation families the executor
//! drives, behind the `MediaControl` trait.

pub mod spotify;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::action::SearchType;
use crate::error::AppError;
use crate::session::AccessCredential;

/// Page size used when listing the caller's playlists.
pub const MAX_PLAYLISTS: u32 = 50;

/// A track, artist or playlist as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub uri: String,
    #[serde(default)]
    pub name: String,
}

/// What a playback-start call should play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// An ordered list of item URIs.
    Tracks(Vec<String>),
    /// A collection URI (artist or playlist).
    Context(String),
}

impl PlaybackTarget {
    pub fn to_body(&self) -> Value {
        match self {
            Self::Tracks(uris) => json!({ "uris": uris }),
            Self::Context(uri) => json!({ "context_uri": uri }),
        }
    }
}

/// Body-less playback mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Resume,
    Pause,
    Next,
    Previous,
}

impl PlaybackCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resume => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

/// Remote playback control. Every call is a single attempt; errors are
/// `RemoteActionError` carrying the upstream message.
#[async_trait]
pub trait MediaControl: Send + Sync {
    async fn transport(&self, credential: &AccessCredential, command: PlaybackCommand) -> Result<(), AppError>;

    async fn start_playback(&self, credential: &AccessCredential, target: &PlaybackTarget) -> Result<(), AppError>;

    /// Ranked catalog search, at most `limit` items.
    async fn search(
        &self,
        credential: &AccessCredential,
        query: &str,
        search_type: SearchType,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, AppError>;

    async fn artist_top_tracks(
        &self,
        credential: &AccessCredential,
        artist_id: &str,
        market: &str,
    ) -> Result<Vec<CatalogItem>, AppError>;

    /// The caller's own playlists in listing order.
    async fn my_playlists(&self, credential: &AccessCredential, limit: u32) -> Result<Vec<CatalogItem>, AppError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_target_bodies() {
        let tracks = PlaybackTarget::Tracks(vec!["spotify:track:1".into(), "spotify:track:2".into()]);
        assert_eq!(
            tracks.to_body(),
            json!({ "uris": ["spotify:track:1", "spotify:track:2"] })
        );
        let ctx = PlaybackTarget::Context("spotify:playlist:9".into());
        assert_eq!(ctx.to_body(), json!({ "context_uri": "spotify:playlist:9" }));
    }

    #[test]
    fn test_catalog_item_tolerates_missing_name() {
        let item: CatalogItem = serde_json::from_value(json!({ "id": "a", "uri": "u", "extra": 1 })).unwrap();
        assert_eq!(item.name, "");
    }
}
