//! Deterministic text → action rules, used whenever the model stage is
//! unavailable or produces nothing usable.
//!
//! Rules are evaluated in table order and the first hit wins. Every rule is a
//! plain function so it can be tested on its own.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::sanitize::clamp;
use crate::action::{SearchType, StructuredAction, NAME_MAX_CHARS, QUERY_MAX_CHARS};

/// A named pattern rule. `apply` returns `None` when the rule does not match.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<StructuredAction>,
}

/// The ordered rule table.
pub const RULES: &[Rule] = &[
    Rule {
        name: "pause",
        apply: pause_rule,
    },
    Rule {
        name: "next",
        apply: next_rule,
    },
    Rule {
        name: "previous",
        apply: previous_rule,
    },
    Rule {
        name: "my_playlist",
        apply: my_playlist_rule,
    },
    Rule {
        name: "artist_top_tracks",
        apply: artist_top_tracks_rule,
    },
    Rule {
        name: "search_and_play",
        apply: search_and_play_rule,
    },
];

/// Interpret `text` with the rule table. Never fails: unmatched input is `play`.
pub fn interpret(text: &str) -> StructuredAction {
    let text = text.trim();
    for rule in RULES {
        if let Some(action) = (rule.apply)(text) {
            debug!(rule = rule.name, "heuristic rule matched");
            return action;
        }
    }
    debug!("no heuristic rule matched, defaulting to play");
    StructuredAction::Play
}

// ── Patterns ─────────────────────────────────────────────────────

/// Compile a rule pattern. A bad pattern disables its rule and is logged.
fn pattern(re: &str) -> Option<Regex> {
    match Regex::new(re) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            warn!(pattern = re, error = %e, "heuristic pattern failed to compile, rule disabled");
            None
        }
    }
}

static PAUSE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"(?i)\b(?:pause|stop)\b"));
static NEXT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"(?i)\b(?:next|skip)\b"));
static PREVIOUS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?i)\b(?:previous|back)\b"));
static MY_PLAYLIST_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?i)\bplay\s+(?:my\s+)?(.+?)\s+playlist\b"));
static TOP_TRACKS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    pattern(r"(?i)(?:\btop\s+(?:songs|tracks)\s+by|\bplay\s+top\s+songs\s+of)\s+(.+)$")
});
static PLAY_PREFIX_RE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"(?i)^play\s+(.+)$"));
static LEADING_THE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern(r"(?i)^the\b\s*"));
static TRAILING_PLAYLIST_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?i)(?:^|\s+)playlist$"));

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// First capture group, trimmed; `None` when absent or blank.
fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(text)?;
    let captured = caps.get(1)?.as_str().trim();
    (!captured.is_empty()).then(|| captured.to_string())
}

// ── Rules ────────────────────────────────────────────────────────

fn pause_rule(text: &str) -> Option<StructuredAction> {
    is_match(&PAUSE_RE, text).then_some(StructuredAction::Pause)
}

fn next_rule(text: &str) -> Option<StructuredAction> {
    is_match(&NEXT_RE, text).then_some(StructuredAction::Next)
}

fn previous_rule(text: &str) -> Option<StructuredAction> {
    is_match(&PREVIOUS_RE, text).then_some(StructuredAction::Previous)
}

fn my_playlist_rule(text: &str) -> Option<StructuredAction> {
    let name = capture(&MY_PLAYLIST_RE, text)?;
    Some(StructuredAction::PlayMyPlaylist {
        playlist_name: clamp(&name, NAME_MAX_CHARS),
    })
}

fn artist_top_tracks_rule(text: &str) -> Option<StructuredAction> {
    let name = capture(&TOP_TRACKS_RE, text)?;
    Some(StructuredAction::PlayArtistTopTracks {
        artist_name: clamp(&name, NAME_MAX_CHARS),
    })
}

fn search_and_play_rule(text: &str) -> Option<StructuredAction> {
    let rest = capture(&PLAY_PREFIX_RE, text)?;
    let rest = match LEADING_THE_RE.as_ref() {
        Some(re) => re.replace(&rest, "").into_owned(),
        None => rest,
    };

    let (query, search_type) = match TRAILING_PLAYLIST_RE.as_ref() {
        Some(re) if re.is_match(&rest) => (re.replace(&rest, "").into_owned(), SearchType::Playlist),
        _ => (rest, SearchType::Track),
    };

    let query = clamp(&query, QUERY_MAX_CHARS);
    if query.is_empty() {
        return None;
    }
    Some(StructuredAction::SearchAndPlay { query, search_type })
}
