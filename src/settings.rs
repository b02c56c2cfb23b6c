use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::error::AppError;
use crate::util::{atomic_write, read_json, write_json};

/// Environment variable that overrides the stored model API key.
pub const LLM_API_KEY_ENV: &str = "TUNECUE_LLM_API_KEY";

// ── LLM provider types ──────────────────────────────────────────

/// Which generative model provider interprets commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub enum LlmProvider {
    Anthropic,
    OpenAiCompatible,
    Gemini,
}

impl LlmProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "openai-compatible" | "openaicompatible" => Some(Self::OpenAiCompatible),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }
}

fn default_llm_timeout_secs() -> u64 {
    20
}

/// Model provider used by the interpretation stage.
///
/// `api_key` lives in `.credentials` (see [`load_api_key`]/[`save_api_key`])
/// or the environment, never in `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override (OpenAI-compatible servers, Gemini proxies).
    #[serde(default)]
    pub base_url: Option<String>,
    /// None picks the provider's default model.
    #[serde(default)]
    pub model: Option<String>,
    /// Deadline for a single model call.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmProviderConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Redacted view of the LLM config (no raw API key).
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct LlmConfigInfo {
    pub provider: LlmProvider,
    pub has_api_key: bool,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl LlmConfigInfo {
    #[must_use]
    pub fn from_config(config: &LlmProviderConfig) -> Self {
        Self {
            provider: config.provider,
            has_api_key: config.has_api_key(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

// ── Media API ────────────────────────────────────────────────────

/// Connection settings for the media-control Web API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct MediaApiConfig {
    pub base_url: String,
    /// Market used for artist top-track lookups.
    pub market: String,
    /// Deadline for a single media API call.
    pub timeout_secs: u64,
}

impl Default for MediaApiConfig {
    fn default() -> Self {
        Self {
            base_url: crate::media::spotify::DEFAULT_BASE_URL.to_string(),
            market: "US".to_string(),
            timeout_secs: 10,
        }
    }
}

// ── Server ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

// ── App settings ─────────────────────────────────────────────────

/// Contents of `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppSettings {
    #[serde(default = "default_settings_version")]
    pub version: u32,
    #[serde(default)]
    pub llm: LlmProviderConfig,
    #[serde(default)]
    pub media: MediaApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

const SETTINGS_VERSION: u32 = 1;

fn default_settings_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            llm: LlmProviderConfig::default(),
            media: MediaApiConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// The stored model API key, if any.
pub fn load_api_key(app_config_dir: &Path) -> Option<String> {
    let path = crate::paths::credentials_path(app_config_dir);
    std::fs::read_to_string(path)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Store the model API key. An empty key removes the file.
pub fn save_api_key(app_config_dir: &Path, key: &str) -> Result<(), AppError> {
    std::fs::create_dir_all(app_config_dir)?;
    let path = crate::paths::credentials_path(app_config_dir);
    if key.is_empty() {
        let _ = std::fs::remove_file(&path);
    } else {
        atomic_write(&path, key.as_bytes())?;
    }
    Ok(())
}

/// `None` when there is no settings file.
///
/// A malformed file is reported and treated as absent. The model API key comes
/// from the credentials file.
pub fn load_settings(app_config_dir: &Path) -> Option<AppSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    let mut settings = match read_json::<AppSettings>(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            return None;
        }
    };

    if settings.llm.api_key.is_none() {
        settings.llm.api_key = load_api_key(app_config_dir);
    }

    Some(settings)
}

/// Load settings (or defaults) and apply environment overrides.
pub fn load_effective_settings(app_config_dir: &Path) -> AppSettings {
    let mut settings = load_settings(app_config_dir).unwrap_or_default();
    apply_env_overrides(&mut settings, std::env::var(LLM_API_KEY_ENV).ok());
    settings
}

/// A non-empty `TUNECUE_LLM_API_KEY` wins over the credentials file.
pub fn apply_env_overrides(settings: &mut AppSettings, env_api_key: Option<String>) {
    if let Some(key) = env_api_key.filter(|k| !k.trim().is_empty()) {
        settings.llm.api_key = Some(key.trim().to_string());
    }
}

pub fn save_settings(app_config_dir: &Path, settings: &AppSettings) -> Result<(), AppError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
