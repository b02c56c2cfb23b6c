//! Validation and normalization of candidate actions.
//!
//! Candidates arrive as untyped JSON, usually straight out of a model
//! response. `sanitize` never fails: an unknown action degrades to `play`,
//! unknown parameter keys are dropped and every kept value is coerced to a
//! trimmed, length-capped string.

use serde_json::{Map, Value};

use crate::action::{
    ActionKind, ParamRule, SearchType, StructuredAction, PARAM_ARTIST_NAME, PARAM_PLAYLIST_NAME,
    PARAM_QUERY, PARAM_TYPE,
};

/// Rebuild a candidate `{action, parameters}` object into a well-formed action.
pub fn sanitize(candidate: &Value) -> StructuredAction {
    let Some(kind) = candidate
        .get("action")
        .and_then(Value::as_str)
        .and_then(ActionKind::from_slug)
    else {
        return StructuredAction::Play;
    };

    let params = candidate.get("parameters").and_then(Value::as_object);
    let text = |key: &str| -> String {
        let spec = kind.params().iter().find(|p| p.key == key);
        match spec.map(|p| p.rule) {
            Some(ParamRule::Text { max_chars }) => clamp(&coerce(params, key), max_chars),
            Some(ParamRule::SearchType) | None => String::new(),
        }
    };

    match kind {
        ActionKind::Play => StructuredAction::Play,
        ActionKind::Pause => StructuredAction::Pause,
        ActionKind::Next => StructuredAction::Next,
        ActionKind::Previous => StructuredAction::Previous,
        ActionKind::SearchAndPlay => StructuredAction::SearchAndPlay {
            query: text(PARAM_QUERY),
            search_type: SearchType::from_slug(&coerce(params, PARAM_TYPE)).unwrap_or_default(),
        },
        ActionKind::PlayArtistTopTracks => StructuredAction::PlayArtistTopTracks {
            artist_name: text(PARAM_ARTIST_NAME),
        },
        ActionKind::PlayMyPlaylist => StructuredAction::PlayMyPlaylist {
            playlist_name: text(PARAM_PLAYLIST_NAME),
        },
    }
}

/// Re-run an already typed action through the sanitizer.
pub fn sanitize_action(action: &StructuredAction) -> StructuredAction {
    sanitize(&action.to_value())
}

/// Trim, cut to `max_chars` characters, and trim again so a cut never
/// leaves trailing whitespace behind.
pub fn clamp(s: &str, max_chars: usize) -> String {
    let cut: String = s.trim().chars().take(max_chars).collect();
    cut.trim_end().to_string()
}

/// Scalars become their string form; missing, null and structured values become "".
fn coerce(params: Option<&Map<String, Value>>, key: &str) -> String {
    match params.and_then(|p| p.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null | Value::Array(_) | Value::Object(_)) | None => String::new(),
    }
}
