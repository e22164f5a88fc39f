// Odoo MCP Gate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI and MCP stdio server for local Odoo environments.
// Usage:
//   odoo-mcp-gate serve                          # Run MCP server (stdio)
//   odoo-mcp-gate tools                          # Print tool catalog
//   odoo-mcp-gate profiles                       # Show configured Odoo roots
//   odoo-mcp-gate call <tool> [json-args]        # One-shot tool call
//   odoo-mcp-gate session                        # Show session journal
//   odoo-mcp-gate reset                          # Clear session journal
//   odoo-mcp-gate init-config                    # Write default config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odoo_mcp_gate::{
    config::ServerConfig,
    dispatch::Dispatcher,
    mcp::{self, Journal, Server},
    paths,
    profiles::ProfileRegistry,
    storage::SessionStore,
};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "odoo-mcp-gate")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "Odoo MCP Gate - manage local Odoo environments over MCP")]
struct Cli {
    /// Config file (default: $ODOO_MCP_CONFIG or <state-dir>/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// State directory for the session journal and command log
    #[arg(short, long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// Print the tool catalog as JSON
    Tools,

    /// List configured Odoo profiles
    Profiles,

    /// Run one tool call and print its text
    Call {
        /// Tool name (e.g. odoo_status)
        tool: String,

        /// Arguments as JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Show the persisted session journal
    Session,

    /// Clear the session journal
    Reset,

    /// Write the default config if none exists
    InitConfig {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // stdout carries JSON-RPC; env_logger writes to stderr
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();

    let state_dir = cli.state_dir.clone().unwrap_or_else(|| paths::state_dir().to_path_buf());
    let config_path = match (&cli.config, &cli.state_dir) {
        (Some(p), _) => p.clone(),
        (None, Some(dir)) if std::env::var_os("ODOO_MCP_CONFIG").is_none() => dir.join("config.json"),
        _ => paths::default_config_path(),
    };

    if let Commands::InitConfig { force } = &cli.command {
        if config_path.exists() && !force {
            println!("Config already exists at {:?} (use --force to overwrite)", config_path);
            return Ok(());
        }
        ServerConfig::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write config {:?}", config_path))?;
        println!("Default config written to {:?}", config_path);
        return Ok(());
    }

    let config = ServerConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {:?}", config_path))?;

    match &cli.command {
        Commands::Serve => {
            std::fs::create_dir_all(&state_dir)
                .with_context(|| format!("Failed to create state dir {:?}", state_dir))?;

            let db_path = paths::session_db_path(&state_dir);
            let journal = match Journal::open(&db_path) {
                Ok(j) => Some(j),
                Err(e) => {
                    log::warn!("Session journal unavailable at {:?}: {}", db_path, e);
                    None
                }
            };

            let mut server = Server::new(Dispatcher::with_shell(config))
                .with_journal(journal)
                .with_cmd_log(paths::cmd_log_path(&state_dir));
            mcp::run(&mut server)?;
        }

        Commands::Tools => {
            let dispatcher = Dispatcher::with_shell(config);
            println!("{}", serde_json::to_string_pretty(&json!({ "tools": dispatcher.tools().definitions() }))?);
        }

        Commands::Profiles => {
            let registry = ProfileRegistry::from_config(&config);
            for profile in registry.iter() {
                let marker = if profile.id == registry.default_id() { "*" } else { " " };
                let missing = if profile.root.is_dir() { "" } else { "  (missing)" };
                println!("{} {:<10} {:<12} {}{}", marker, profile.id, profile.name, profile.root.display(), missing);
            }
        }

        Commands::Call { tool, args } => {
            let args: Value = serde_json::from_str(args)
                .with_context(|| format!("Invalid arguments JSON: {}", args))?;
            let result = Dispatcher::with_shell(config).handle(tool, &args);
            println!("{}", result.text);
            if result.is_error {
                std::process::exit(1);
            }
        }

        Commands::Session => {
            let store = SessionStore::open(&paths::session_db_path(&state_dir))?;
            match store.load_session()? {
                Some(session) => {
                    println!("{}", session.status_summary());
                    println!("{}", serde_json::to_string_pretty(&session)?);
                }
                None => println!("No session recorded."),
            }
        }

        Commands::Reset => {
            let store = SessionStore::open(&paths::session_db_path(&state_dir))?;
            store.clear()?;
            println!("Session reset.");
        }

        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
