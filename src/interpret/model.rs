//! Primary interpretation stage: ask a generative model for the action JSON.
//!
//! `try_interpret` returns `None` on every failure path (no model configured,
//! transport error, rate limit, unusable output) and the caller falls back to
//! the heuristic rules.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::sanitize::sanitize;
use crate::action::{ActionKind, StructuredAction};
use crate::llm::TextModel;

const INSTRUCTIONS: &str = "You turn a music listener's request into exactly one playback action.
Allowed actions and their parameters:
- play: {} (resume playback)
- pause: {}
- next: {}
- previous: {}
- search_and_play: {\"query\": string, \"type\": \"track\" | \"artist\" | \"playlist\"}
- play_artist_top_tracks: {\"artistName\": string}
- play_my_playlist: {\"playlistName\": string} (one of the user's own playlists)
Reply with a single JSON object of the form {\"action\": ..., \"parameters\": {...}}.
Output JSON only: no commentary, no explanation, no markdown code fences.";

/// Fixed (command, expected JSON) pairs shown to the model.
pub const EXAMPLES: &[(&str, &str)] = &[
    ("Pause the music", r#"{"action":"pause","parameters":{}}"#),
    ("skip this song", r#"{"action":"next","parameters":{}}"#),
    ("go back one track", r#"{"action":"previous","parameters":{}}"#),
    ("resume", r#"{"action":"play","parameters":{}}"#),
    (
        "play Bohemian Rhapsody",
        r#"{"action":"search_and_play","parameters":{"query":"Bohemian Rhapsody","type":"track"}}"#,
    ),
    (
        "put on some Miles Davis",
        r#"{"action":"search_and_play","parameters":{"query":"Miles Davis","type":"artist"}}"#,
    ),
    (
        "play the Today's Top Hits playlist",
        r#"{"action":"search_and_play","parameters":{"query":"Today's Top Hits","type":"playlist"}}"#,
    ),
    (
        "play the top songs by Daft Punk",
        r#"{"action":"play_artist_top_tracks","parameters":{"artistName":"Daft Punk"}}"#,
    ),
    (
        "play my workout playlist",
        r#"{"action":"play_my_playlist","parameters":{"playlistName":"workout"}}"#,
    ),
];

/// Instructions + examples + the user's command, as one prompt string.
pub fn build_prompt(command: &str) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\nExamples:\n");
    for (example, expected) in EXAMPLES {
        prompt.push_str(&format!("Command: {example}\nJSON: {expected}\n"));
    }
    prompt.push_str(&format!("\nCommand: {}\nJSON:", command.trim()));
    prompt
}

/// Remove a leading ```lang marker and a trailing ``` marker, plus whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// The last balanced top-level `{...}` block in `raw`, ignoring braces inside
/// JSON strings.
pub fn extract_last_object(raw: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut last = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        last = raw.get(s..=i);
                    }
                }
            }
            _ => {}
        }
    }
    last
}

/// JavaScript-style truthiness of the `action` field.
fn has_truthy_action(value: &Value) -> bool {
    match value.get("action") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn usable_candidate(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| v.is_object() && has_truthy_action(v))
}

/// Parse raw model output into a sanitized action, or `None` when the output
/// holds no usable candidate. A candidate naming an action outside the
/// allowed set is unusable.
pub fn parse_model_output(raw: &str) -> Option<StructuredAction> {
    let candidate = usable_candidate(strip_code_fences(raw))
        .or_else(|| extract_last_object(raw).and_then(usable_candidate))?;

    let named = candidate.get("action").and_then(Value::as_str);
    if named.and_then(ActionKind::from_slug).is_none() {
        debug!(action = ?candidate.get("action"), "model proposed a disallowed action");
        return None;
    }
    Some(sanitize(&candidate))
}

/// Model-backed interpreter stage.
#[derive(Clone, Default)]
pub struct ModelInterpreter {
    model: Option<Arc<dyn TextModel>>,
}

impl ModelInterpreter {
    pub fn new(model: Option<Arc<dyn TextModel>>) -> Self {
        Self { model }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// One model call, no retry. `None` means "use the fallback".
    pub async fn try_interpret(&self, text: &str) -> Option<StructuredAction> {
        let model = self.model.as_ref()?;

        let raw = match model.complete(&build_prompt(text)).await {
            Ok(raw) => raw,
            Err(e) if e.is_rate_limit() => {
                warn!(error = %e, "model rate limited or over quota, using heuristic fallback");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "model call failed, using heuristic fallback");
                return None;
            }
        };

        let parsed = parse_model_output(&raw);
        if parsed.is_none() {
            let preview: String = raw.chars().take(200).collect();
            warn!(output = %preview, "model output unusable, using heuristic fallback");
        }
        parsed
    }
}
