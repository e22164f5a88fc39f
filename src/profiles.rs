// Odoo MCP Gate - Environment Registry
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Maps a profile id (e.g. "odoo18") to its root directory and display
// name. Built once from ServerConfig, read-only afterwards. Resolution is
// a pure lookup; root existence is the dispatcher's job.

use crate::config::{EnvironmentProfile, ServerConfig};
use crate::error::ToolError;

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    /// Config order is preserved so error listings are stable
    profiles: Vec<EnvironmentProfile>,
    default_id: String,
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<EnvironmentProfile>, default_id: impl Into<String>) -> Self {
        Self { profiles, default_id: default_id.into() }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.profiles.clone(), config.default_profile.clone())
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Look up a profile; `None` means the built-in default
    pub fn resolve(&self, id: Option<&str>) -> Result<&EnvironmentProfile, ToolError> {
        let id = id.unwrap_or(&self.default_id);
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ToolError::UnknownProfile {
                id: id.to_string(),
                known: self.ids(),
            })
    }

    pub fn ids(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentProfile> {
        self.profiles.iter()
    }
}
