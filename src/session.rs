// Odoo MCP Gate - Session Journal
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// In-memory record of what this server has done. Persisted to LMDB after
// every call. Purely diagnostic: nothing here feeds back into dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::ToolResult;
use crate::switch::RESTARTED_LINE;

pub const MAX_FAILURES: usize = 50;
pub const MAX_SWITCHES: usize = 50;

const SWITCH_TOOL: &str = "odoo_switch_database";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub call_count: u64,
    pub last_tool: Option<String>,
    pub last_profile: Option<String>,
    pub started: DateTime<Utc>,
    pub last_call: Option<DateTime<Utc>>,
    pub failures: Vec<FailureEntry>,
    #[serde(default)]
    pub switches: Vec<SwitchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchEntry {
    pub timestamp: DateTime<Utc>,
    pub profile: String,
    pub project: String,
    pub restarted: bool,
}

fn push_bounded<T>(list: &mut Vec<T>, item: T, cap: usize) {
    list.push(item);
    if list.len() > cap {
        list.remove(0);
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            call_count: 0,
            last_tool: None,
            last_profile: None,
            started: Utc::now(),
            last_call: None,
            failures: Vec::new(),
            switches: Vec::new(),
        }
    }

    /// Record one tools/call and its result
    pub fn record_call(&mut self, tool: &str, profile: &str, project: Option<&str>, result: &ToolResult) {
        self.call_count += 1;
        self.last_tool = Some(tool.to_string());
        self.last_profile = Some(profile.to_string());
        self.last_call = Some(Utc::now());

        if result.is_error {
            self.record_failure(tool, &result.text);
        } else if tool == SWITCH_TOOL {
            if let Some(project) = project {
                self.record_switch(profile, project, result.text.contains(RESTARTED_LINE));
            }
        }
    }

    pub fn record_failure(&mut self, tool: &str, error: &str) {
        let error: String = error.chars().take(500).collect();
        push_bounded(
            &mut self.failures,
            FailureEntry { timestamp: Utc::now(), tool: tool.to_string(), error },
            MAX_FAILURES,
        );
    }

    pub fn record_switch(&mut self, profile: &str, project: &str, restarted: bool) {
        push_bounded(
            &mut self.switches,
            SwitchEntry {
                timestamp: Utc::now(),
                profile: profile.to_string(),
                project: project.to_string(),
                restarted,
            },
            MAX_SWITCHES,
        );
    }

    /// Status summary string
    pub fn status_summary(&self) -> String {
        format!(
            "Calls: {} | Failures: {} | Switches: {} | Last: {} on {} | Since: {}",
            self.call_count,
            self.failures.len(),
            self.switches.len(),
            self.last_tool.as_deref().unwrap_or("none"),
            self.last_profile.as_deref().unwrap_or("-"),
            self.started.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
