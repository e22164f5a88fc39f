// Odoo MCP Gate - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Loads environment profiles and executor limits. Built-in defaults
// cover the single odoo18 profile; a JSON file may override any field.
// Immutable after startup.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::paths::{expand_home, home_dir};

pub const DEFAULT_PROFILE_ID: &str = "odoo18";
pub const DEFAULT_MANAGE_COMMAND: &str = "./manage_odoo.sh";
/// Output ceiling for a single command (10 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
/// Wall-clock ceiling for a single command (5 minutes)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// A named Odoo environment: where it lives and what to call it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub id: String,
    pub root: PathBuf,
    pub name: String,
}

impl EnvironmentProfile {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { id: id.into(), root: root.into(), name: name.into() }
    }
}

/// Master gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Profile used when a call omits `version`
    pub default_profile: String,
    pub profiles: Vec<EnvironmentProfile>,
    /// Manage script invoked with start/stop/update/... (relative to profile root)
    pub manage_command: String,
    pub max_output_bytes: usize,
    pub command_timeout_secs: u64,
    /// Fixed extraction target for odoo_import_database
    pub import_dir: PathBuf,
    /// Where Odoo keeps filestores; only quoted in the manual import procedure
    pub filestore_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_profile: DEFAULT_PROFILE_ID.to_string(),
            profiles: vec![EnvironmentProfile::new(
                DEFAULT_PROFILE_ID,
                home_dir().join("git").join("odoo18"),
                "Odoo 18",
            )],
            manage_command: DEFAULT_MANAGE_COMMAND.to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            import_dir: std::env::temp_dir().join("odoo_import_temp"),
            filestore_dir: home_dir().join(".local/share/Odoo/filestore"),
        }
    }
}

impl ServerConfig {
    /// Load config from JSON file, falling back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in config {:?}", path))?;
            log::info!("Config loaded from {:?}", path);
            config
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Self::default()
        };
        config.expand_paths();
        config.check()?;
        Ok(config)
    }

    /// Save config to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve `~/` in every configured path
    fn expand_paths(&mut self) {
        for profile in &mut self.profiles {
            profile.root = expand_home(&profile.root.to_string_lossy());
        }
        self.import_dir = expand_home(&self.import_dir.to_string_lossy());
        self.filestore_dir = expand_home(&self.filestore_dir.to_string_lossy());
    }

    /// Reject configs the registry could not serve
    pub fn check(&self) -> anyhow::Result<()> {
        if self.profiles.is_empty() {
            bail!("config defines no profiles");
        }
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.id.trim().is_empty() {
                bail!("profile with empty id (root {:?})", profile.root);
            }
            if !seen.insert(profile.id.as_str()) {
                bail!("duplicate profile id: {}", profile.id);
            }
        }
        if !seen.contains(self.default_profile.as_str()) {
            bail!(
                "default_profile '{}' is not one of the configured profiles",
                self.default_profile
            );
        }
        if self.max_output_bytes == 0 || self.command_timeout_secs == 0 {
            bail!("max_output_bytes and command_timeout_secs must be positive");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_executor_ceilings() {
        let config = ServerConfig::default();
        assert_eq!(config.default_profile, "odoo18");
        assert_eq!(config.max_output_bytes, 10 * 1024 * 1024);
        assert_eq!(config.command_timeout_secs, 300);
        assert_eq!(config.manage_command, "./manage_odoo.sh");
        assert!(config.profiles[0].root.ends_with("git/odoo18"));
        assert!(config.check().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = ServerConfig::load(&dir.path().join("absent.json"))?;
        assert_eq!(config.profiles.len(), 1);
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "default_profile": "odoo17",
                "profiles": [
                    {"id": "odoo17", "root": "~/git/odoo17", "name": "Odoo 17"},
                    {"id": "odoo18", "root": "/srv/odoo18", "name": "Odoo 18"}
                ]
            }"#,
        )?;
        let config = ServerConfig::load(&path)?;
        assert_eq!(config.default_profile, "odoo17");
        assert_eq!(config.profiles[0].root, home_dir().join("git/odoo17"));
        assert_eq!(config.profiles[1].root, PathBuf::from("/srv/odoo18"));
        assert_eq!(config.command_timeout_secs, 300);
        Ok(())
    }

    #[test]
    fn rejects_duplicate_and_dangling_default() {
        let mut config = ServerConfig::default();
        config.profiles.push(config.profiles[0].clone());
        assert!(config.check().is_err());

        let mut config = ServerConfig::default();
        config.default_profile = "odoo16".to_string();
        let err = config.check().unwrap_err().to_string();
        assert!(err.contains("odoo16"));
    }

    #[test]
    fn save_then_load_preserves_profiles() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/config.json");
        let mut config = ServerConfig::default();
        config.profiles.push(EnvironmentProfile::new("odoo17", "/srv/odoo17", "Odoo 17"));
        config.save(&path)?;
        let loaded = ServerConfig::load(&path)?;
        assert_eq!(loaded.profiles, config.profiles);
        Ok(())
    }
}
