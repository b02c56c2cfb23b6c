//! Centralized path definitions for config files and log directories.
//!
//! Functions accept `&Path` so they work the same for the server, the CLI and tests.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "com.tunecue.app";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const CREDENTIALS_FILE: &str = ".credentials";

// ── Directory names ──────────────────────────────────────────────

pub const COMMAND_LOGS_DIR: &str = "command-logs";

// ── Config-dir functions (take app_config_dir) ───────────────────

/// Default config dir: `<os config dir>/com.tunecue.app`, or `./com.tunecue.app`
/// when the platform reports none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_ID)
}

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

pub fn credentials_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(CREDENTIALS_FILE)
}

pub fn command_logs_dir(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(COMMAND_LOGS_DIR)
}
