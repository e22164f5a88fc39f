// Odoo MCP Gate - Action Handlers
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One handler per catalog tool. Handlers see validated arguments and a
// profile whose root is known to exist; they return a ToolResult or a
// ToolError for the dispatcher to render.

use std::path::{Path, PathBuf};

use crate::config::{EnvironmentProfile, ServerConfig};
use crate::dispatch::ToolResult;
use crate::error::ToolError;
use crate::executor::{shell_quote, CommandRunner};
use crate::import;
use crate::odoo_conf::{self, ACTIVE_CONF, CORE_ADDONS_DIR, ENTERPRISE_DIR, LOG_FILE};
use crate::switch::{self, SwitchLocks};
use crate::tools::{ArgKind, ValidatedArgs};

pub const DEFAULT_LOG_LINES: u64 = 50;

/// Everything a handler may touch for one call
pub struct HandlerContext<'a> {
    pub profile: &'a EnvironmentProfile,
    pub args: &'a ValidatedArgs,
    pub runner: &'a dyn CommandRunner,
    pub config: &'a ServerConfig,
    pub locks: &'a SwitchLocks,
}

impl HandlerContext<'_> {
    /// Run the manage script with a subcommand; returns the outcome text
    fn manage(&self, subcommand: &str) -> Result<String, ToolError> {
        let line = format!("{} {}", self.config.manage_command, subcommand);
        Ok(self.runner.run(self.profile, &line)?.text())
    }

    fn error_flag(&self) -> &'static str {
        if self.args.flag("errorOnly") {
            " --error-only"
        } else {
            ""
        }
    }
}

/// Route a validated call to its handler
pub fn invoke(tool: &str, ctx: &HandlerContext<'_>) -> Result<ToolResult, ToolError> {
    match tool {
        // ====== SERVER CONTROL ======
        "odoo_start" => Ok(ToolResult::text(format!("Odoo started:\n{}", ctx.manage("start")?))),
        "odoo_stop" => Ok(ToolResult::text(format!("Odoo stopped:\n{}", ctx.manage("stop")?))),
        "odoo_restart" => Ok(ToolResult::text(format!("Odoo restarted:\n{}", ctx.manage("restart")?))),
        "odoo_status" => Ok(ToolResult::text(ctx.manage("status")?)),

        // ====== MODULE MANAGEMENT ======
        "odoo_update_modules" => module_command(ctx, "update", "modules", "Modules updated"),
        "odoo_update_module" => module_command(ctx, "update", "module", "Modules updated"),
        "odoo_install_modules" => module_command(ctx, "install", "modules", "Modules installed"),
        "odoo_update_frontend" => module_command(ctx, "frontend", "modules", "Frontend modules updated"),
        "odoo_run_tests" => run_tests(ctx),
        "odoo_shell" => Ok(shell_hint(ctx)),

        // ====== DATABASE ======
        "odoo_switch_database" => {
            let project = ctx.args.require_str("project")?.trim();
            let report = switch::switch_config(
                ctx.profile,
                project,
                ctx.runner,
                &ctx.config.manage_command,
                ctx.locks,
            )?;
            Ok(ToolResult::text(report.message()))
        }
        "odoo_list_databases" => list_databases(ctx.profile),
        "odoo_import_database" => {
            let backup = ctx.args.require_str("backupFile")?;
            let report = import::prepare_import(ctx.profile, backup, &ctx.config.import_dir)?;
            Ok(ToolResult::text(report.message(&ctx.config.filestore_dir)))
        }
        "odoo_get_logs" => get_logs(ctx),

        // ====== DIRECTORIES ======
        "odoo_get_project_dir" => project_dir(ctx.profile, ctx.args.require_str("project")?.trim()),
        "odoo_get_odoo_addon_dir" => Ok(existing_path(
            ctx.profile.root.join(CORE_ADDONS_DIR),
            "Odoo core addon directory not found",
            |p| format!("Odoo core addons directory: {}\n\nThis contains the standard Odoo community modules.", p),
        )),
        "odoo_get_enterprise_dir" => Ok(existing_path(
            ctx.profile.root.join(ENTERPRISE_DIR),
            "Enterprise directory not found",
            |p| format!("Odoo Enterprise addons directory: {}\n\nThis contains the Odoo Enterprise modules.", p),
        )),
        "odoo_get_config_path" => Ok(existing_path(
            ctx.profile.root.join(ACTIVE_CONF),
            "Configuration file not found",
            |p| format!("Active Odoo configuration: {}\n\nThis is the configuration file currently in use by Odoo.", p),
        )),
        "odoo_get_project_config_path" => Ok(project_config_path(ctx.profile, ctx.args.require_str("project")?.trim())),

        _ => Err(ToolError::UnknownOperation(tool.to_string())),
    }
}

fn module_command(
    ctx: &HandlerContext<'_>,
    subcommand: &str,
    field: &str,
    heading: &str,
) -> Result<ToolResult, ToolError> {
    let modules = ctx.args.require_str(field)?.trim();
    if modules.is_empty() {
        return Err(ToolError::MissingArgument(field.to_string()));
    }
    let output = ctx.manage(&format!("{} {}{}", subcommand, shell_quote(modules), ctx.error_flag()))?;
    Ok(ToolResult::text(format!("{}: {}\n{}", heading, modules, output)))
}

fn run_tests(ctx: &HandlerContext<'_>) -> Result<ToolResult, ToolError> {
    let mut subcommand = String::from("test");
    for field in ["modules", "testTags"] {
        if let Some(value) = ctx.args.non_empty_str(field) {
            subcommand.push(' ');
            subcommand.push_str(&shell_quote(value));
        }
    }
    subcommand.push_str(ctx.error_flag());
    let output = ctx.manage(&subcommand)?;
    Ok(ToolResult::text(format!("Test results:\n{}", output)))
}

/// The shell is interactive; hand back the command instead of running it
fn shell_hint(ctx: &HandlerContext<'_>) -> ToolResult {
    ToolResult::text(format!(
        "To start Odoo shell, run this command in your terminal:\ncd {} && {} shell\n\n\
         Note: This is an interactive command that requires direct terminal access.",
        shell_quote(&ctx.profile.root.to_string_lossy()),
        ctx.config.manage_command,
    ))
}

fn get_logs(ctx: &HandlerContext<'_>) -> Result<ToolResult, ToolError> {
    let lines = match ctx.args.get("lines") {
        None => DEFAULT_LOG_LINES,
        Some(_) => ctx.args.u64("lines").filter(|n| *n > 0).ok_or_else(|| ToolError::InvalidArgumentType {
            field: "lines".to_string(),
            expected: ArgKind::Number,
        })?,
    };
    let log_file = ctx.profile.root.join(LOG_FILE);
    if !log_file.is_file() {
        // informational, not a failure
        return Ok(ToolResult::text(format!("Log file not found: {}", log_file.display())));
    }
    let output = ctx.runner.run(ctx.profile, &format!("tail -n {} {}", lines, LOG_FILE))?.text();
    Ok(ToolResult::text(format!("Last {} lines of {}:\n{}", lines, LOG_FILE, output)))
}

fn list_databases(profile: &EnvironmentProfile) -> Result<ToolResult, ToolError> {
    let files = odoo_conf::list_conf_files(&profile.root)
        .map_err(|e| ToolError::io(format!("Failed to list databases in {}", profile.root.display()), e))?;
    let current = odoo_conf::current_db_name(&profile.root).unwrap_or_else(|| "unknown".to_string());

    let mut output = format!("Current database: {}\n\nAvailable database configurations:\n", current);
    for file in &files {
        let marker = if file == ACTIVE_CONF { " (active)" } else { "" };
        output.push_str(&format!("  - {}{}\n", file, marker));
    }
    Ok(ToolResult::text(output))
}

/// Real target of a symlink; `None` for plain directories or broken links
fn resolve_link(path: &Path) -> Option<PathBuf> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    if !meta.file_type().is_symlink() {
        return None;
    }
    std::fs::canonicalize(path).ok()
}

fn project_dir(profile: &EnvironmentProfile, project: &str) -> Result<ToolResult, ToolError> {
    let path = profile.root.join(project);
    if !odoo_conf::is_plain_name(project) || !path.exists() {
        return Ok(ToolResult::error(format!("Project directory not found: {}", path.display())));
    }
    let mut text = format!("Project directory: {}\n", path.display());
    if let Some(real) = resolve_link(&path) {
        text.push_str(&format!("Real path: {}\n", real.display()));
    }
    text.push_str(&format!("\nThis is your custom addons directory for the {} project.", project));
    Ok(ToolResult::text(text))
}

fn project_config_path(profile: &EnvironmentProfile, project: &str) -> ToolResult {
    let name = odoo_conf::project_conf_name(project);
    let path = profile.root.join(&name);
    if !odoo_conf::is_plain_name(project) || !path.is_file() {
        return ToolResult::error(format!(
            "Project configuration file not found: {}\n\nExpected: {}",
            path.display(),
            name
        ));
    }
    ToolResult::text(format!(
        "Project configuration: {}\n\nThis is the original configuration for the {} project.\n\
         Use 'odoo_switch_database' to make this the active configuration.",
        path.display(),
        project
    ))
}

/// Existence check shared by the fixed-path lookups
fn existing_path(path: PathBuf, missing: &str, found: impl Fn(&str) -> String) -> ToolResult {
    if path.exists() {
        ToolResult::text(found(&path.display().to_string()))
    } else {
        ToolResult::error(format!("{}: {}", missing, path.display()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
