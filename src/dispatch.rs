// Odoo MCP Gate - Dispatcher
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Turns (tool name, raw arguments) into a ToolResult. Order per call:
// profile lookup, root check, argument validation, handler. Any failure
// becomes an isError result; nothing escapes to the transport.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::{EnvironmentProfile, ServerConfig};
use crate::error::ToolError;
use crate::executor::{CommandRunner, ShellExecutor};
use crate::handlers::{self, HandlerContext};
use crate::profiles::ProfileRegistry;
use crate::switch::SwitchLocks;
use crate::tools::{ArgKind, ToolRegistry, PROFILE_ARG};

/// Text answer for one tools/call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }

    /// MCP `result` body
    pub fn to_mcp(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error
        })
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::error(format!("Error: {}", err))
    }
}

pub struct Dispatcher {
    config: ServerConfig,
    profiles: ProfileRegistry,
    tools: ToolRegistry,
    runner: Arc<dyn CommandRunner>,
    locks: SwitchLocks,
}

impl Dispatcher {
    pub fn new(config: ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            profiles: ProfileRegistry::from_config(&config),
            tools: ToolRegistry::new(&config.default_profile),
            config,
            runner,
            locks: SwitchLocks::new(),
        }
    }

    /// Dispatcher that runs real commands through `sh -c`
    pub fn with_shell(config: ServerConfig) -> Self {
        let runner = Arc::new(ShellExecutor::from_config(&config));
        Self::new(config, runner)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Handle one call. Never fails; errors come back with `is_error` set.
    pub fn handle(&self, name: &str, raw_args: &Value) -> ToolResult {
        match self.try_handle(name, raw_args) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{} failed: {}", name, e);
                e.into()
            }
        }
    }

    /// Profile id a call targets, before any validation
    pub fn requested_profile(&self, raw_args: &Value) -> Result<Option<String>, ToolError> {
        match raw_args.get(PROFILE_ARG) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ToolError::InvalidArgumentType {
                field: PROFILE_ARG.to_string(),
                expected: ArgKind::String,
            }),
        }
    }

    fn profile_for(&self, raw_args: &Value) -> Result<&EnvironmentProfile, ToolError> {
        let id = self.requested_profile(raw_args)?;
        let profile = self.profiles.resolve(id.as_deref())?;
        if !profile.root.is_dir() {
            return Err(ToolError::ProfileRootMissing(profile.root.clone()));
        }
        Ok(profile)
    }

    fn try_handle(&self, name: &str, raw_args: &Value) -> Result<ToolResult, ToolError> {
        let profile = self.profile_for(raw_args)?;
        // unknown tool names surface here, after the profile checks
        let args = self.tools.validate(name, raw_args)?;
        log::debug!("{} on {} ({})", name, profile.id, profile.root.display());

        let ctx = HandlerContext {
            profile,
            args: &args,
            runner: self.runner.as_ref(),
            config: &self.config,
            locks: &self.locks,
        };
        handlers::invoke(name, &ctx)
    }
}

// ============================================================================
// TESTS
// ============================================================================
