// Odoo MCP Gate - Tool Registry
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Static catalog of every tool the gateway exposes, each with a typed
// argument schema. Validation fills defaults, coerces unambiguous
// strings, drops unknown fields, and names the field that failed.

use serde::Serialize;
use serde_json::{json, Map, Number, Value};
use std::fmt;

use crate::error::ToolError;

/// Argument name every tool accepts for profile selection
pub const PROFILE_ARG: &str = "version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    String,
    Number,
    Boolean,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::String => "string",
            ArgKind::Number => "number",
            ArgKind::Boolean => "boolean",
        })
    }
}

/// One field of a tool's argument schema
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ArgSpec {
    pub fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self { name, kind, required: true, default: None, description }
    }

    pub fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self { name, kind, required: false, default: None, description }
    }

    /// Required fields never carry a default
    pub fn with_default(mut self, value: Value) -> Self {
        debug_assert!(!self.required, "required argument {} cannot have a default", self.name);
        self.default = Some(value);
        self
    }

    /// Check (and where unambiguous, coerce) a raw value against this field
    fn coerce(&self, raw: &Value) -> Result<Value, ToolError> {
        let mismatch = || ToolError::InvalidArgumentType {
            field: self.name.to_string(),
            expected: self.kind,
        };
        match (self.kind, raw) {
            (ArgKind::String, Value::String(_)) => Ok(raw.clone()),
            (ArgKind::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ArgKind::Number, Value::Number(_)) => Ok(raw.clone()),
            (ArgKind::Number, Value::String(s)) => parse_number(s.trim()).ok_or_else(mismatch),
            (ArgKind::Boolean, Value::Bool(_)) => Ok(raw.clone()),
            (ArgKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(n) = s.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

/// Name, description and argument schema of one tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgSpec>,
}

impl ToolDescriptor {
    /// MCP tools/list entry
    pub fn to_mcp(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            let mut prop = json!({
                "type": arg.kind,
                "description": arg.description,
            });
            if let Some(default) = &arg.default {
                prop["default"] = default.clone();
            }
            properties.insert(arg.name.to_string(), prop);
        }
        let required: Vec<&str> = self.args.iter().filter(|a| a.required).map(|a| a.name).collect();
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

/// Arguments that passed schema validation, defaults filled in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    /// Present and non-blank string
    pub fn non_empty_str(&self, name: &str) -> Option<&str> {
        self.str(name).map(str::trim).filter(|s| !s.is_empty())
    }

    /// For fields the schema marks required
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.str(name).ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Non-negative integer; fractional values round down
    pub fn u64(&self, name: &str) -> Option<u64> {
        let v = self.values.get(name)?;
        v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// The fixed tool catalog
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Build the catalog; `default_profile` becomes the schema default for `version`
    pub fn new(default_profile: &str) -> Self {
        Self { tools: tool_catalog(default_profile) }
    }

    /// Stable, declaration-ordered list
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// All tools/list entries
    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(ToolDescriptor::to_mcp).collect()
    }

    pub fn validate(&self, name: &str, raw: &Value) -> Result<ValidatedArgs, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownOperation(name.to_string()))?;
        let empty = Map::new();
        let raw = raw.as_object().unwrap_or(&empty);

        let mut values = Map::new();
        for arg in &tool.args {
            match raw.get(arg.name).filter(|v| !v.is_null()) {
                Some(v) => {
                    values.insert(arg.name.to_string(), arg.coerce(v)?);
                }
                None if arg.required => return Err(ToolError::MissingArgument(arg.name.to_string())),
                None => {
                    if let Some(default) = &arg.default {
                        values.insert(arg.name.to_string(), default.clone());
                    }
                }
            }
        }
        Ok(ValidatedArgs { values })
    }
}

// ============================================================================
// CATALOG
// ============================================================================

fn tool(name: &'static str, description: &'static str, default_profile: &str, extra: Vec<ArgSpec>) -> ToolDescriptor {
    let mut args = vec![ArgSpec::optional(PROFILE_ARG, ArgKind::String, "Odoo version (e.g., 'odoo18')")
        .with_default(json!(default_profile))];
    args.extend(extra);
    ToolDescriptor { name, description, args }
}

fn error_only() -> ArgSpec {
    ArgSpec::optional("errorOnly", ArgKind::Boolean, "Show only error output").with_default(json!(false))
}

fn project() -> ArgSpec {
    ArgSpec::required("project", ArgKind::String, "Project name (e.g., 'hhfbs', 'tora', 'nellika')")
}

fn tool_catalog(dp: &str) -> Vec<ToolDescriptor> {
    vec![
        // ====== SERVER CONTROL ======
        tool(
            "odoo_start",
            "Start the Odoo server. Use this when the user asks to start Odoo, launch Odoo, or run Odoo.",
            dp,
            vec![],
        ),
        tool(
            "odoo_stop",
            "Stop the running Odoo server. Use this when the user asks to stop Odoo, shutdown Odoo, or kill Odoo.",
            dp,
            vec![],
        ),
        tool(
            "odoo_restart",
            "Restart the Odoo server. Use this when the user asks to restart Odoo, reboot Odoo, or reload Odoo.",
            dp,
            vec![],
        ),
        tool("odoo_status", "Check if Odoo server is running", dp, vec![]),

        // ====== MODULE MANAGEMENT ======
        tool(
            "odoo_update_modules",
            "Update one or more Odoo modules",
            dp,
            vec![
                ArgSpec::required(
                    "modules",
                    ArgKind::String,
                    "Comma-separated list of modules to update (e.g., 'sale,purchase')",
                ),
                error_only(),
            ],
        ),
        tool(
            "odoo_update_module",
            "Update a single Odoo module (alias for odoo_update_modules)",
            dp,
            vec![
                ArgSpec::required("module", ArgKind::String, "Module name to update (e.g., 'sale' or 'purchase')"),
                error_only(),
            ],
        ),
        tool(
            "odoo_install_modules",
            "Install one or more Odoo modules",
            dp,
            vec![
                ArgSpec::required(
                    "modules",
                    ArgKind::String,
                    "Comma-separated list of modules to install (e.g., 'stock_account,hr')",
                ),
                error_only(),
            ],
        ),
        tool(
            "odoo_update_frontend",
            "Update frontend modules and automatically restart Odoo",
            dp,
            vec![
                ArgSpec::required("modules", ArgKind::String, "Comma-separated list of frontend modules to update"),
                error_only(),
            ],
        ),
        tool(
            "odoo_run_tests",
            "Run tests for Odoo modules",
            dp,
            vec![
                ArgSpec::optional(
                    "modules",
                    ArgKind::String,
                    "Comma-separated list of modules to test (empty for all tests)",
                ),
                ArgSpec::optional(
                    "testTags",
                    ArgKind::String,
                    "Test tags to filter tests (e.g., 'at_install', 'post_install')",
                ),
                error_only(),
            ],
        ),
        tool("odoo_shell", "Start interactive Odoo shell", dp, vec![]),

        // ====== DATABASE ======
        tool(
            "odoo_switch_database",
            "Switch between different Odoo database configurations",
            dp,
            vec![project()],
        ),
        tool("odoo_list_databases", "List available database configurations", dp, vec![]),
        tool(
            "odoo_import_database",
            "Import an Odoo database backup (.zip file)",
            dp,
            vec![ArgSpec::required("backupFile", ArgKind::String, "Path to the backup .zip file")],
        ),
        tool(
            "odoo_get_logs",
            "Get the last N lines from Odoo logs",
            dp,
            vec![ArgSpec::optional("lines", ArgKind::Number, "Number of lines to retrieve").with_default(json!(50))],
        ),

        // ====== DIRECTORIES ======
        tool(
            "odoo_get_project_dir",
            "Get the path to a project's custom addon directory (e.g., ~/git/odoo18/<project>). This is usually a symlink to ~/git/<project>",
            dp,
            vec![project()],
        ),
        tool(
            "odoo_get_odoo_addon_dir",
            "Get the path to the Odoo core addons directory (~/git/odoo18/odoo)",
            dp,
            vec![],
        ),
        tool(
            "odoo_get_enterprise_dir",
            "Get the path to the Odoo Enterprise addons directory (~/git/odoo18/enterprise)",
            dp,
            vec![],
        ),
        tool(
            "odoo_get_config_path",
            "Get the path to the active Odoo configuration file (~/git/odoo18/odoo.conf)",
            dp,
            vec![],
        ),
        tool(
            "odoo_get_project_config_path",
            "Get the path to a project-specific Odoo configuration file (~/git/odoo18/odoo-<project>.conf)",
            dp,
            vec![project()],
        ),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
