use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Structured error type for command handling. The frontend matches on the
/// `code` tag; `Display` is the human-readable `details` string.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, TS)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
#[ts(export)]
pub enum AppError {
    #[error("No command provided")]
    InvalidInput,
    #[error("Not authenticated with the media service")]
    Unauthenticated,
    #[error("No {kind} found for \"{query}\"")]
    NotFound { query: String, kind: String },
    #[error("No top tracks available for \"{artist}\"")]
    NoTracks { artist: String },
    #[error("{message}")]
    RemoteActionError { message: String },
    #[error("Unknown action: {action}")]
    UnknownAction { action: String },
    #[error("I/O error: {message}")]
    Io { message: String },
    #[error("Settings error: {message}")]
    Settings { message: String },
}

impl AppError {
    /// Stable snake-case code, identical to the serialized `code` tag.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput => "invalid_input",
            AppError::Unauthenticated => "unauthenticated",
            AppError::NotFound { .. } => "not_found",
            AppError::NoTracks { .. } => "no_tracks",
            AppError::RemoteActionError { .. } => "remote_action_error",
            AppError::UnknownAction { .. } => "unknown_action",
            AppError::Io { .. } => "io",
            AppError::Settings { .. } => "settings",
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        AppError::RemoteActionError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Settings {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("Media API request timed out: {e}")
        } else {
            format!("Media API request failed: {e}")
        };
        AppError::RemoteActionError { message }
    }
}

/// Allow converting AppError to String for CLI output.
impl From<AppError> for String {
    fn from(e: AppError) -> String {
        e.to_string()
    }
}
