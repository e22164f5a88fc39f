// Odoo MCP Gate - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for gateway-owned paths: user home, state dir,
// default config file, command log. Cached via OnceLock.
//
// Profile roots are NOT resolved here. They come from ServerConfig and
// are checked for existence on every call by the dispatcher.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static HOME_CACHE: OnceLock<PathBuf> = OnceLock::new();
static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// User home directory.
///
/// Resolution order:
///   1. HOME environment variable
///   2. USERPROFILE (Windows)
///   3. Current directory (last resort, never panics)
pub fn home_dir() -> &'static Path {
    HOME_CACHE.get_or_init(|| {
        if let Ok(home) = std::env::var("HOME") {
            if !home.is_empty() {
                return PathBuf::from(home);
            }
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return PathBuf::from(profile);
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    })
}

/// Gateway state directory (session journal, command log, default config).
///
/// Resolution order:
///   1. ODOO_MCP_HOME environment variable
///   2. ~/.odoo-mcp-gate
pub fn state_dir() -> &'static Path {
    STATE_DIR_CACHE.get_or_init(|| {
        if let Ok(dir) = std::env::var("ODOO_MCP_HOME") {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        home_dir().join(".odoo-mcp-gate")
    })
}

/// Default config file: $ODOO_MCP_CONFIG, else <state>/config.json
pub fn default_config_path() -> PathBuf {
    match std::env::var("ODOO_MCP_CONFIG") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => state_dir().join("config.json"),
    }
}

/// Persistent command log under a state directory
pub fn cmd_log_path(state: &Path) -> PathBuf {
    state.join("cmd.log")
}

/// LMDB session journal under a state directory
pub fn session_db_path(state: &Path) -> PathBuf {
    state.join("SESSION.DB")
}

/// Expand a leading `~/` against the user home. Other paths pass through.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return home_dir().to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(raw),
    }
}
