//! Centralized path definitions for config and export files.
//!
//! Functions accept `&Path` so the server and the CLI resolve files the same way.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "gh-bridge";

/// Overrides the config directory when set.
pub const CONFIG_DIR_ENV: &str = "GH_BRIDGE_CONFIG_DIR";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const KNOWLEDGE_BASE_FILE: &str = "components.json";

// ── Config-dir functions ─────────────────────────────────────────

/// `$GH_BRIDGE_CONFIG_DIR`, else `$XDG_CONFIG_HOME/gh-bridge`, else
/// `~/.config/gh-bridge`, else `./.gh-bridge`.
pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(base) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(base).join(APP_ID);
    }
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(home) => PathBuf::from(home).join(".config").join(APP_ID),
        None => PathBuf::from(format!(".{APP_ID}")),
    }
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}

pub fn knowledge_base_path(config_dir: &Path) -> PathBuf {
    config_dir.join(KNOWLEDGE_BASE_FILE)
}
