//! Best-effort JSONL log of orchestrated commands.
//!
//! One line per command in `{config_dir}/command-logs/YYYY-MM-DD.jsonl`.
//! Write failures are swallowed and never reach the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::action::ActionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAuditEntry {
    pub ts: u64,
    pub command: String,
    /// Absent when the command was rejected before interpretation.
    pub action: Option<ActionRecord>,
    pub ok: bool,
    pub message: String,
    pub duration_ms: u64,
}

impl CommandAuditEntry {
    pub fn new(command: &str, action: Option<ActionRecord>, result: Result<&str, &str>, elapsed: Duration) -> Self {
        let (ok, message) = match result {
            Ok(msg) => (true, msg),
            Err(e) => (false, e),
        };
        Self {
            ts: epoch_secs(),
            command: command.to_string(),
            action,
            ok,
            message: message.to_string(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Append `entry` to the log file for its day.
pub fn log_command(app_config_dir: &Path, entry: &CommandAuditEntry) {
    let dir = crate::paths::command_logs_dir(app_config_dir);
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let path = dir.join(format!("{}.jsonl", date_from_epoch(entry.ts)));

    let Ok(line) = serde_json::to_string(entry) else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{line}");
    }
}

/// `YYYY-MM-DD` (UTC) for a Unix timestamp.
#[allow(clippy::unreadable_literal, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn date_from_epoch(epoch_secs: u64) -> String {
    // Howard Hinnant's civil_from_days.
    let z = (epoch_secs / 86400) as i64 + 719468;
    let era = z.div_euclid(146097);
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i64 + era * 400 + i64::from(month <= 2);

    format!("{year:04}-{month:02}-{day:02}")
}
