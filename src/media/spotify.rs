//! `MediaControl` over the Spotify Web API (or anything that speaks it).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{CatalogItem, MediaControl, PlaybackCommand, PlaybackTarget};
use crate::action::SearchType;
use crate::error::AppError;
use crate::session::AccessCredential;
use crate::settings::MediaApiConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct TopTracks {
    #[serde(default)]
    tracks: Vec<Value>,
}

/// Items that carry a string `id` and `uri`. Nulls and unplayable entries
/// (local files have `id: null`) are skipped one by one.
fn present(items: Vec<Value>) -> Vec<CatalogItem> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

pub struct SpotifyClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SpotifyClient {
    pub fn new(config: &MediaApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send one authenticated request; non-2xx becomes `RemoteActionError`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        credential: &AccessCredential,
    ) -> Result<reqwest::Response, AppError> {
        let response = request
            .bearer_auth(credential.secret())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::remote(remote_error_message(status.as_u16(), &body)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        credential: &AccessCredential,
    ) -> Result<T, AppError> {
        let response = self.send(self.client.get(self.url(path)).query(query), credential).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::remote(format!("Unexpected media API response: {e}")))
    }
}

/// `error.message` from a Web API error body, else the raw body.
pub fn remote_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    if detail.is_empty() {
        format!("Media API returned HTTP {status}")
    } else {
        format!("Media API returned HTTP {status}: {detail}")
    }
}

#[async_trait]
impl MediaControl for SpotifyClient {
    async fn transport(&self, credential: &AccessCredential, command: PlaybackCommand) -> Result<(), AppError> {
        let request = match command {
            PlaybackCommand::Resume => self
                .client
                .put(self.url("/me/player/play"))
                .header(reqwest::header::CONTENT_LENGTH, 0),
            PlaybackCommand::Pause => self
                .client
                .put(self.url("/me/player/pause"))
                .header(reqwest::header::CONTENT_LENGTH, 0),
            PlaybackCommand::Next => self
                .client
                .post(self.url("/me/player/next"))
                .header(reqwest::header::CONTENT_LENGTH, 0),
            PlaybackCommand::Previous => self
                .client
                .post(self.url("/me/player/previous"))
                .header(reqwest::header::CONTENT_LENGTH, 0),
        };
        debug!(command = command.name(), "playback mutation");
        self.send(request, credential).await?;
        Ok(())
    }

    async fn start_playback(&self, credential: &AccessCredential, target: &PlaybackTarget) -> Result<(), AppError> {
        debug!(?target, "start playback");
        let request = self.client.put(self.url("/me/player/play")).json(&target.to_body());
        self.send(request, credential).await?;
        Ok(())
    }

    async fn search(
        &self,
        credential: &AccessCredential,
        query: &str,
        search_type: SearchType,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, AppError> {
        let params = [
            ("q", query.to_string()),
            ("type", search_type.slug().to_string()),
            ("limit", limit.to_string()),
        ];
        let json: Value = self.get_json("/search", &params, credential).await?;
        let page = json
            .get(search_type.plural())
            .cloned()
            .map(serde_json::from_value::<Page>)
            .transpose()
            .map_err(|e| AppError::remote(format!("Unexpected search response: {e}")))?;
        let items = page.map(|p| present(p.items)).unwrap_or_default();
        debug!(query, kind = search_type.slug(), hits = items.len(), "catalog search");
        Ok(items)
    }

    async fn artist_top_tracks(
        &self,
        credential: &AccessCredential,
        artist_id: &str,
        market: &str,
    ) -> Result<Vec<CatalogItem>, AppError> {
        let path = format!("/artists/{artist_id}/top-tracks");
        let top: TopTracks = self
            .get_json(&path, &[("market", market.to_string())], credential)
            .await?;
        Ok(present(top.tracks))
    }

    async fn my_playlists(&self, credential: &AccessCredential, limit: u32) -> Result<Vec<CatalogItem>, AppError> {
        let page: Page = self
            .get_json("/me/playlists", &[("limit", limit.to_string())], credential)
            .await?;
        Ok(present(page.items))
    }
}
