// Odoo MCP Gate - MCP Server (JSON-RPC 2.0 over stdio)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Line-delimited JSON-RPC on stdin/stdout. Every tools/call goes through
// the Dispatcher; tool failures come back as isError results, never as
// JSON-RPC errors. The loop ends only at EOF.

use crate::dispatch::Dispatcher;
use crate::session::Session;
use crate::storage::SessionStore;
use chrono::Local;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "odoo-mcp-gate";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persistent command log
fn cmd_log(path: &Option<PathBuf>, msg: &str) {
    let Some(path) = path else { return };
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(f, "[{}] {}", ts, msg);
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}…", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Summarize tool params for logging
fn param_summary(name: &str, args: &Value) -> String {
    let version = args.get("version").and_then(|v| v.as_str()).unwrap_or("default");
    let field = |key: &str| args.get(key).and_then(|v| v.as_str()).unwrap_or("?").to_string();
    let detail = match name {
        n if n.contains("module") || n.contains("frontend") => {
            let modules = args.get("modules").or_else(|| args.get("module")).and_then(|v| v.as_str());
            format!("modules={}", clip(modules.unwrap_or("?"), 150))
        }
        "odoo_run_tests" => format!(
            "modules={} tags={}",
            args.get("modules").and_then(|v| v.as_str()).unwrap_or("-"),
            args.get("testTags").and_then(|v| v.as_str()).unwrap_or("-"),
        ),
        n if n.contains("project") || n.contains("switch") => format!("project={}", field("project")),
        "odoo_import_database" => format!("backup={}", field("backupFile")),
        "odoo_get_logs" => format!("lines={}", args.get("lines").map(|v| v.to_string()).unwrap_or_default()),
        _ => return format!("version={}", version),
    };
    format!("version={} {}", version, detail)
}

fn response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

fn send(out: &mut impl Write, msg: &Value) -> io::Result<()> {
    let line = serde_json::to_string(msg)?;
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Journal plus its LMDB home; absent when the store could not be opened
pub struct Journal {
    pub session: Session,
    pub store: SessionStore,
}

impl Journal {
    /// Open the store and resume the saved session, or start fresh
    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        let store = SessionStore::open(path)?;
        let session = store.load_session()?.unwrap_or_default();
        Ok(Self { session, store })
    }
}

pub struct Server {
    dispatcher: Dispatcher,
    journal: Option<Journal>,
    cmd_log: Option<PathBuf>,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher, journal: None, cmd_log: None }
    }

    pub fn with_journal(mut self, journal: Option<Journal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_cmd_log(mut self, path: PathBuf) -> Self {
        self.cmd_log = Some(path);
        self
    }

    fn call_tool(&mut self, params: &Value) -> Value {
        let name = params["name"].as_str().unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        cmd_log(&self.cmd_log, &format!("CALL {} | {}", name, param_summary(name, &args)));

        let result = self.dispatcher.handle(name, &args);

        if result.is_error {
            cmd_log(&self.cmd_log, &format!("FAIL {} | {}", name, clip(&result.text, 200)));
        }

        if let Some(journal) = self.journal.as_mut() {
            let profile = self
                .dispatcher
                .requested_profile(&args)
                .ok()
                .flatten()
                .unwrap_or_else(|| self.dispatcher.profiles().default_id().to_string());
            let project = args.get("project").and_then(|v| v.as_str());
            journal.session.record_call(name, &profile, project, &result);
            if let Err(e) = journal.store.save_session(&journal.session) {
                log::warn!("Failed to persist session journal: {}", e);
            }
        }

        result.to_mcp()
    }

    /// Answer one parsed message. `None` for notifications.
    pub fn handle_message(&mut self, msg: &Value) -> Option<Value> {
        let method = msg["method"].as_str().unwrap_or("");
        let id = &msg["id"];
        let params = &msg["params"];

        log::debug!("Received: {}", method);

        match method {
            "initialize" => Some(response(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": SERVER_VERSION,
                    }
                }),
            )),

            "notifications/initialized" => None,

            "tools/list" => Some(response(id, json!({ "tools": self.dispatcher.tools().definitions() }))),

            "tools/call" => {
                let result = self.call_tool(params);
                // a call sent as a notification runs but gets no reply
                if id.is_null() {
                    None
                } else {
                    Some(response(id, result))
                }
            }

            "ping" => Some(response(id, json!({}))),

            _ => {
                if id.is_null() {
                    None
                } else {
                    Some(error_response(id, -32601, &format!("Unknown method: {}", method)))
                }
            }
        }
    }

    /// Serve until `input` reaches EOF
    pub fn serve(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        for line in input.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::error!("stdin read error: {}", e);
                    continue;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let msg: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("JSON parse error: {}", e);
                    continue;
                }
            };

            if let Some(reply) = self.handle_message(&msg) {
                send(out, &reply)?;
            }
        }
        Ok(())
    }
}

/// Run the server on the process's stdin/stdout
pub fn run(server: &mut Server) -> io::Result<()> {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    server.serve(stdin.lock(), &mut out)
}

// ============================================================================
// TESTS
// ============================================================================
