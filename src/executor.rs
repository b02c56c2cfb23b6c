//! Maps a sanitized `StructuredAction` onto ordered media API calls.

use std::sync::Arc;

use tracing::info;

use crate::action::{SearchType, StructuredAction};
use crate::error::AppError;
use crate::media::{CatalogItem, MediaControl, PlaybackCommand, PlaybackTarget, MAX_PLAYLISTS};
use crate::session::AccessCredential;

#[derive(Clone)]
pub struct ActionExecutor {
    media: Arc<dyn MediaControl>,
    market: String,
}

/// First playlist whose name contains `wanted`, ignoring case. Listing order
/// decides ties.
pub fn select_playlist<'a>(playlists: &'a [CatalogItem], wanted: &str) -> Option<&'a CatalogItem> {
    let wanted = wanted.to_lowercase();
    playlists
        .iter()
        .find(|p| p.name.to_lowercase().contains(&wanted))
}

fn not_found(query: &str, kind: &str) -> AppError {
    AppError::NotFound {
        query: query.to_string(),
        kind: kind.to_string(),
    }
}

impl ActionExecutor {
    pub fn new(media: Arc<dyn MediaControl>, market: impl Into<String>) -> Self {
        Self {
            media,
            market: market.into(),
        }
    }

    /// Run one action. Sub-steps are sequential and the first failure aborts.
    pub async fn execute(&self, action: &StructuredAction, credential: &AccessCredential) -> Result<(), AppError> {
        match action {
            StructuredAction::Play => self.media.transport(credential, PlaybackCommand::Resume).await?,
            StructuredAction::Pause => self.media.transport(credential, PlaybackCommand::Pause).await?,
            StructuredAction::Next => self.media.transport(credential, PlaybackCommand::Next).await?,
            StructuredAction::Previous => self.media.transport(credential, PlaybackCommand::Previous).await?,
            StructuredAction::SearchAndPlay { query, search_type } => {
                self.search_and_play(credential, query, *search_type).await?
            }
            StructuredAction::PlayArtistTopTracks { artist_name } => {
                self.play_artist_top_tracks(credential, artist_name).await?
            }
            StructuredAction::PlayMyPlaylist { playlist_name } => {
                self.play_my_playlist(credential, playlist_name).await?
            }
        }
        info!(action = %action.description(), "action executed");
        Ok(())
    }

    async fn search_and_play(
        &self,
        credential: &AccessCredential,
        query: &str,
        search_type: SearchType,
    ) -> Result<(), AppError> {
        if query.is_empty() {
            return Err(not_found(query, search_type.slug()));
        }
        let hits = self.media.search(credential, query, search_type, 1).await?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| not_found(query, search_type.slug()))?;

        let target = match search_type {
            SearchType::Track => PlaybackTarget::Tracks(vec![first.uri]),
            SearchType::Artist | SearchType::Playlist => PlaybackTarget::Context(first.uri),
        };
        self.media.start_playback(credential, &target).await
    }

    async fn play_artist_top_tracks(&self, credential: &AccessCredential, artist_name: &str) -> Result<(), AppError> {
        if artist_name.is_empty() {
            return Err(not_found(artist_name, "artist"));
        }
        let artist = self
            .media
            .search(credential, artist_name, SearchType::Artist, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(artist_name, "artist"))?;

        let tracks = self
            .media
            .artist_top_tracks(credential, &artist.id, &self.market)
            .await?;
        if tracks.is_empty() {
            return Err(AppError::NoTracks {
                artist: artist_name.to_string(),
            });
        }

        let uris = tracks.into_iter().map(|t| t.uri).collect();
        self.media
            .start_playback(credential, &PlaybackTarget::Tracks(uris))
            .await
    }

    async fn play_my_playlist(&self, credential: &AccessCredential, playlist_name: &str) -> Result<(), AppError> {
        if playlist_name.is_empty() {
            return Err(not_found(playlist_name, "playlist"));
        }
        let playlists = self.media.my_playlists(credential, MAX_PLAYLISTS).await?;
        let chosen = select_playlist(&playlists, playlist_name).ok_or_else(|| not_found(playlist_name, "playlist"))?;
        self.media
            .start_playback(credential, &PlaybackTarget::Context(chosen.uri.clone()))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// Scripted `MediaControl` that records every call in order.
    #[derive(Default)]
    pub(crate) struct FakeMedia {
        pub calls: Mutex<Vec<String>>,
        pub search_hits: Vec<CatalogItem>,
        pub top_tracks: Vec<CatalogItem>,
        pub playlists: Vec<CatalogItem>,
        pub fail_transport: Option<String>,
    }

    pub(crate) fn item(id: &str, kind: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            uri: format!("spotify:{kind}:{id}"),
            name: name.to_string(),
        }
    }

    impl FakeMedia {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl MediaControl for FakeMedia {
        async fn transport(&self, _: &AccessCredential, command: PlaybackCommand) -> Result<(), AppError> {
            self.record(format!("transport:{}", command.name()));
            match &self.fail_transport {
                Some(message) => Err(AppError::remote(message.clone())),
                None => Ok(()),
            }
        }

        async fn start_playback(&self, _: &AccessCredential, target: &PlaybackTarget) -> Result<(), AppError> {
            let call = match target {
                PlaybackTarget::Tracks(uris) => format!("start:tracks:{}", uris.join(",")),
                PlaybackTarget::Context(uri) => format!("start:context:{uri}"),
            };
            self.record(call);
            Ok(())
        }

        async fn search(
            &self,
            _: &AccessCredential,
            query: &str,
            search_type: SearchType,
            limit: u32,
        ) -> Result<Vec<CatalogItem>, AppError> {
            self.record(format!("search:{}:{query}:{limit}", search_type.slug()));
            Ok(self.search_hits.iter().take(limit as usize).cloned().collect())
        }

        async fn artist_top_tracks(
            &self,
            _: &AccessCredential,
            artist_id: &str,
            market: &str,
        ) -> Result<Vec<CatalogItem>, AppError> {
            self.record(format!("top_tracks:{artist_id}:{market}"));
            Ok(self.top_tracks.clone())
        }

        async fn my_playlists(&self, _: &AccessCredential, limit: u32) -> Result<Vec<CatalogItem>, AppError> {
            self.record(format!("playlists:{limit}"));
            Ok(self.playlists.clone())
        }
    }

    fn cred() -> AccessCredential {
        AccessCredential::new("tok").unwrap()
    }

    fn executor(media: &Arc<FakeMedia>) -> ActionExecutor {
        ActionExecutor::new(media.clone(), "US")
    }

    #[tokio::test]
    async fn test_transport_actions_are_single_calls() {
        let media = Arc::new(FakeMedia::default());
        let exec = executor(&media);
        for action in [
            StructuredAction::Play,
            StructuredAction::Pause,
            StructuredAction::Next,
            StructuredAction::Previous,
        ] {
            exec.execute(&action, &cred()).await.unwrap();
        }
        assert_eq!(
            media.calls(),
            ["transport:play", "transport:pause", "transport:next", "transport:previous"]
        );
    }

    #[tokio::test]
    async fn test_search_with_no_results_issues_no_mutation() {
        let media = Arc::new(FakeMedia::default());
        let action = StructuredAction::SearchAndPlay {
            query: "Blue in Green".into(),
            search_type: SearchType::Track,
        };
        let err = executor(&media).execute(&action, &cred()).await.unwrap_err();
        assert_eq!(
            err,
            AppError::NotFound {
                query: "Blue in Green".into(),
                kind: "track".into()
            }
        );
        assert_eq!(media.calls(), ["search:track:Blue in Green:1"]);
    }

    #[tokio::test]
    async fn test_search_track_plays_uri_list_and_others_play_context() {
        let media = Arc::new(FakeMedia {
            search_hits: vec![item("a1", "track", "So What"), item("a2", "track", "Other")],
            ..FakeMedia::default()
        });
        let exec = executor(&media);

        exec.execute(
            &StructuredAction::SearchAndPlay {
                query: "So What".into(),
                search_type: SearchType::Track,
            },
            &cred(),
        )
        .await
        .unwrap();
        exec.execute(
            &StructuredAction::SearchAndPlay {
                query: "Focus".into(),
                search_type: SearchType::Playlist,
            },
            &cred(),
        )
        .await
        .unwrap();

        assert_eq!(
            media.calls(),
            [
                "search:track:So What:1",
                "start:tracks:spotify:track:a1",
                "search:playlist:Focus:1",
                "start:context:spotify:track:a1",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_query_is_not_found_without_remote_calls() {
        let media = Arc::new(FakeMedia::default());
        let action = StructuredAction::PlayMyPlaylist {
            playlist_name: String::new(),
        };
        let err = executor(&media).execute(&action, &cred()).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(media.calls().is_empty());
    }

    #[tokio::test]
    async fn test_artist_top_tracks_plays_full_ordered_list() {
        let media = Arc::new(FakeMedia {
            search_hits: vec![item("art", "artist", "Nina Simone")],
            top_tracks: vec![item("t1", "track", "a"), item("t2", "track", "b"), item("t3", "track", "c")],
            ..FakeMedia::default()
        });
        let action = StructuredAction::PlayArtistTopTracks {
            artist_name: "Nina Simone".into(),
        };
        executor(&media).execute(&action, &cred()).await.unwrap();
        assert_eq!(
            media.calls(),
            [
                "search:artist:Nina Simone:1",
                "top_tracks:art:US",
                "start:tracks:spotify:track:t1,spotify:track:t2,spotify:track:t3",
            ]
        );
    }

    #[tokio::test]
    async fn test_artist_not_found_and_no_tracks() {
        let action = StructuredAction::PlayArtistTopTracks {
            artist_name: "Nobody".into(),
        };

        let media = Arc::new(FakeMedia::default());
        let err = executor(&media).execute(&action, &cred()).await.unwrap_err();
        assert_eq!(
            err,
            AppError::NotFound {
                query: "Nobody".into(),
                kind: "artist".into()
            }
        );

        let media = Arc::new(FakeMedia {
            search_hits: vec![item("art", "artist", "Nobody")],
            ..FakeMedia::default()
        });
        let err = executor(&media).execute(&action, &cred()).await.unwrap_err();
        assert_eq!(err, AppError::NoTracks { artist: "Nobody".into() });
        assert_eq!(media.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_first_matching_playlist_wins() {
        let media = Arc::new(FakeMedia {
            playlists: vec![
                item("p0", "playlist", "Workout"),
                item("p1", "playlist", "Sunday JAZZ mornings"),
                item("p2", "playlist", "Jazz Essentials"),
            ],
            ..FakeMedia::default()
        });
        let action = StructuredAction::PlayMyPlaylist {
            playlist_name: "jazz".into(),
        };
        executor(&media).execute(&action, &cred()).await.unwrap();
        assert_eq!(media.calls(), ["playlists:50", "start:context:spotify:playlist:p1"]);
    }

    #[tokio::test]
    async fn test_playlist_not_found() {
        let media = Arc::new(FakeMedia {
            playlists: vec![item("p0", "playlist", "Workout")],
            ..FakeMedia::default()
        });
        let action = StructuredAction::PlayMyPlaylist {
            playlist_name: "Road Trip".into(),
        };
        let err = executor(&media).execute(&action, &cred()).await.unwrap_err();
        assert_eq!(err.to_string(), "No playlist found for \"Road Trip\"");
        assert_eq!(media.calls(), ["playlists:50"]);
    }

    #[tokio::test]
    async fn test_remote_failure_is_surfaced() {
        let media = Arc::new(FakeMedia {
            fail_transport: Some("No active device found".into()),
            ..FakeMedia::default()
        });
        let err = executor(&media)
            .execute(&StructuredAction::Pause, &cred())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::remote("No active device found"));
    }
}
