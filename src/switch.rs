// Odoo MCP Gate - Configuration Switch
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Makes odoo-<project>.conf the active odoo.conf:
//   Idle -> BackingUp -> Installing -> QueryingStatus -> RestartingIfRunning | Idle
// Backup/install failures abort before any restart. Status/restart failures
// are reported but the swap stands. One switch per profile root at a time.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::EnvironmentProfile;
use crate::error::ToolError;
use crate::executor::CommandRunner;
use crate::odoo_conf::{self, ACTIVE_CONF, BACKUP_CONF};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    BackingUp,
    Installing,
    QueryingStatus,
    RestartingIfRunning,
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchState::Idle => "idle",
            SwitchState::BackingUp => "backing-up",
            SwitchState::Installing => "installing",
            SwitchState::QueryingStatus => "querying-status",
            SwitchState::RestartingIfRunning => "restarting-if-running",
        };
        f.write_str(s)
    }
}

pub const RESTARTED_LINE: &str = "Odoo has been restarted.";

/// What happened after the new config was in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    NotRunning,
    StatusUnknown(String),
    RestartFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub project: String,
    /// An active config existed and was copied to odoo.conf.backup
    pub backed_up: bool,
    pub db_name: Option<String>,
    pub restart: RestartOutcome,
}

impl SwitchReport {
    pub fn message(&self) -> String {
        let mut msg = format!("Switched to database: {}", self.project);
        if let Some(db) = &self.db_name {
            msg.push_str(&format!(" (db_name = {})", db));
        }
        msg.push('\n');
        match &self.restart {
            RestartOutcome::Restarted => msg.push_str(RESTARTED_LINE),
            RestartOutcome::NotRunning => msg.push_str("Odoo is not running. Start it with odoo_start."),
            RestartOutcome::StatusUnknown(e) => msg.push_str(&format!(
                "Could not query Odoo status ({}). If Odoo is running, restart it with odoo_restart.",
                e
            )),
            RestartOutcome::RestartFailed(e) => msg.push_str(&format!(
                "Odoo was running but the restart failed ({}). Restart it with odoo_restart.",
                e
            )),
        }
        if self.backed_up {
            msg.push_str(&format!("\nPrevious configuration saved to {}.", BACKUP_CONF));
        }
        msg
    }
}

/// True when `<cmd> status` output says the server is up.
/// "not running" contains the token too, so it is excluded explicitly.
pub fn reports_running(status: &str) -> bool {
    let lower = status.to_ascii_lowercase();
    lower.contains("running") && !lower.contains("not running")
}

/// One mutex per profile root, created on first use
#[derive(Debug, Default)]
pub struct SwitchLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl SwitchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock for a root; symlinked aliases of the same root share one lock
    pub fn for_root(&self, root: &Path) -> Arc<Mutex<()>> {
        let key = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(map.entry(key).or_default())
    }
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    // a panicked switch leaves no in-memory state worth protecting
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

fn enter(profile: &EnvironmentProfile, state: SwitchState) {
    log::debug!("[switch {}] -> {}", profile.id, state);
}

/// Run the full switch for `project` under the root's lock
pub fn switch_config(
    profile: &EnvironmentProfile,
    project: &str,
    runner: &dyn CommandRunner,
    manage_command: &str,
    locks: &SwitchLocks,
) -> Result<SwitchReport, ToolError> {
    let conf_name = odoo_conf::project_conf_name(project);
    if !odoo_conf::is_plain_name(project) {
        return Err(ToolError::ConfigNotFound(conf_name));
    }

    let lock = locks.for_root(&profile.root);
    let _guard = hold(&lock);

    let root = &profile.root;
    let target = root.join(&conf_name);
    let active = root.join(ACTIVE_CONF);
    let backup = root.join(BACKUP_CONF);

    if !target.is_file() {
        return Err(ToolError::ConfigNotFound(conf_name));
    }

    enter(profile, SwitchState::BackingUp);
    let backed_up = if active.exists() {
        std::fs::copy(&active, &backup)
            .map_err(|e| ToolError::io(format!("Failed to back up {} to {}", ACTIVE_CONF, BACKUP_CONF), e))?;
        true
    } else {
        false
    };

    enter(profile, SwitchState::Installing);
    std::fs::copy(&target, &active)
        .map_err(|e| ToolError::io(format!("Failed to install {} as {}", conf_name, ACTIVE_CONF), e))?;
    log::info!("[switch {}] {} is now active", profile.id, conf_name);
    let db_name = odoo_conf::current_db_name(root);

    enter(profile, SwitchState::QueryingStatus);
    let restart = match runner.run(profile, &format!("{} status", manage_command)) {
        Err(e) => {
            log::warn!("[switch {}] status query failed: {}", profile.id, e);
            RestartOutcome::StatusUnknown(e.to_string())
        }
        Ok(status) if reports_running(&status.stdout) => {
            enter(profile, SwitchState::RestartingIfRunning);
            match runner.run(profile, &format!("{} restart", manage_command)) {
                Ok(_) => RestartOutcome::Restarted,
                Err(e) => {
                    log::warn!("[switch {}] restart failed: {}", profile.id, e);
                    RestartOutcome::RestartFailed(e.to_string())
                }
            }
        }
        Ok(_) => RestartOutcome::NotRunning,
    };
    enter(profile, SwitchState::Idle);

    Ok(SwitchReport {
        project: project.to_string(),
        backed_up,
        db_name,
        restart,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedRunner;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const CMD: &str = "./manage_odoo.sh";

    fn root_with(files: &[(&str, &str)]) -> (TempDir, EnvironmentProfile) {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let profile = EnvironmentProfile::new("odoo18", dir.path(), "Odoo 18");
        (dir, profile)
    }

    fn read(dir: &TempDir, name: &str) -> Option<String> {
        std::fs::read_to_string(dir.path().join(name)).ok()
    }

    fn snapshot(dir: &TempDir) -> Vec<(String, String)> {
        let mut files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                let name = e.file_name().to_string_lossy().to_string();
                let body = std::fs::read_to_string(e.path()).unwrap_or_default();
                (name, body)
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn running_token_detection() {
        assert!(reports_running("Odoo is running (PID 4242)"));
        assert!(reports_running("RUNNING"));
        assert!(!reports_running("Odoo is not running"));
        assert!(!reports_running("stopped"));
        assert!(!reports_running(""));
    }

    #[test]
    fn missing_target_changes_nothing() {
        let (dir, profile) = root_with(&[("odoo.conf", "db_name = demo\n")]);
        let before = snapshot(&dir);
        let runner = ScriptedRunner::with_status("running");
        let err = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap_err();
        assert!(matches!(err, ToolError::ConfigNotFound(ref n) if n == "odoo-acme.conf"));
        assert_eq!(snapshot(&dir), before);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn path_like_project_is_not_found() {
        let (_dir, profile) = root_with(&[("odoo.conf", "db_name = demo\n")]);
        let runner = ScriptedRunner::with_status("stopped");
        let err = switch_config(&profile, "../x", &runner, CMD, &SwitchLocks::new()).unwrap_err();
        assert!(matches!(err, ToolError::ConfigNotFound(_)));
    }

    #[test]
    fn stopped_server_switches_without_restart() {
        let (dir, profile) = root_with(&[
            ("odoo.conf", "[options]\ndb_name = demo\n"),
            ("odoo-acme.conf", "[options]\ndb_name = acme\n"),
        ]);
        let runner = ScriptedRunner::with_status("Odoo is stopped");
        let report = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap();

        assert_eq!(read(&dir, "odoo.conf").as_deref(), Some("[options]\ndb_name = acme\n"));
        assert_eq!(read(&dir, "odoo.conf.backup").as_deref(), Some("[options]\ndb_name = demo\n"));
        assert_eq!(report.restart, RestartOutcome::NotRunning);
        assert!(report.backed_up);
        assert_eq!(report.db_name.as_deref(), Some("acme"));
        assert_eq!(runner.count("restart"), 0);
        assert_eq!(runner.calls(), vec!["./manage_odoo.sh status".to_string()]);
        assert!(report.message().contains("not running"));
    }

    #[test]
    fn running_server_is_restarted_exactly_once() {
        let (_dir, profile) = root_with(&[("odoo.conf", "db_name = demo\n"), ("odoo-acme.conf", "db_name = acme\n")]);
        let runner = ScriptedRunner::with_status("Odoo is running (PID 99)");
        let report = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap();
        assert_eq!(report.restart, RestartOutcome::Restarted);
        assert_eq!(runner.count("./manage_odoo.sh restart"), 1);
        assert!(report.message().contains("restarted"));
    }

    #[test]
    fn no_active_config_means_no_backup() {
        let (dir, profile) = root_with(&[("odoo-acme.conf", "db_name = acme\n")]);
        let runner = ScriptedRunner::with_status("stopped");
        let report = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap();
        assert!(!report.backed_up);
        assert!(read(&dir, "odoo.conf.backup").is_none());
        assert_eq!(read(&dir, "odoo.conf").as_deref(), Some("db_name = acme\n"));
    }

    #[test]
    fn backup_keeps_only_last_generation() {
        let (dir, profile) = root_with(&[
            ("odoo.conf", "db_name = demo\n"),
            ("odoo-a.conf", "db_name = a\n"),
            ("odoo-b.conf", "db_name = b\n"),
        ]);
        let runner = ScriptedRunner::with_status("stopped");
        let locks = SwitchLocks::new();
        switch_config(&profile, "a", &runner, CMD, &locks).unwrap();
        switch_config(&profile, "b", &runner, CMD, &locks).unwrap();
        assert_eq!(read(&dir, "odoo.conf").as_deref(), Some("db_name = b\n"));
        assert_eq!(read(&dir, "odoo.conf.backup").as_deref(), Some("db_name = a\n"));
    }

    #[test]
    fn status_failure_keeps_the_swap() {
        let (dir, profile) = root_with(&[("odoo.conf", "db_name = demo\n"), ("odoo-acme.conf", "db_name = acme\n")]);
        let mut runner = ScriptedRunner::with_status("running");
        runner.fail_on = Some("status");
        let report = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap();
        assert!(matches!(report.restart, RestartOutcome::StatusUnknown(_)));
        assert_eq!(read(&dir, "odoo.conf").as_deref(), Some("db_name = acme\n"));
        assert_eq!(runner.count("restart"), 0);
    }

    #[test]
    fn restart_failure_is_reported_separately() {
        let (_dir, profile) = root_with(&[("odoo-acme.conf", "db_name = acme\n")]);
        let mut runner = ScriptedRunner::with_status("running");
        runner.fail_on = Some("restart");
        let report = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap();
        assert!(matches!(report.restart, RestartOutcome::RestartFailed(_)));
        assert!(report.message().contains("restart failed"));
    }

    #[test]
    fn copy_failure_aborts_before_status() {
        let (dir, profile) = root_with(&[("odoo-acme.conf", "db_name = acme\n")]);
        // a directory where odoo.conf should be makes the copy fail
        std::fs::create_dir(dir.path().join("odoo.conf")).unwrap();
        let runner = ScriptedRunner::with_status("running");
        let err = switch_config(&profile, "acme", &runner, CMD, &SwitchLocks::new()).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }), "got {:?}", err);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn concurrent_switches_on_one_root_serialize() {
        let (dir, profile) = root_with(&[
            ("odoo.conf", "db_name = demo\n"),
            ("odoo-a.conf", "db_name = a\n"),
            ("odoo-b.conf", "db_name = b\n"),
        ]);
        let mut runner = ScriptedRunner::with_status("stopped");
        runner.delay = Duration::from_millis(50);
        let runner = Arc::new(runner);
        let locks = Arc::new(SwitchLocks::new());

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|project| {
                let (runner, locks, profile) = (Arc::clone(&runner), Arc::clone(&locks), profile.clone());
                std::thread::spawn(move || switch_config(&profile, project, runner.as_ref(), CMD, &locks).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let active = read(&dir, "odoo.conf").unwrap();
        let backup = read(&dir, "odoo.conf.backup").unwrap();
        // whichever install ran last wins; its backup is the other target
        match active.as_str() {
            "db_name = a\n" => assert_eq!(backup, "db_name = b\n"),
            "db_name = b\n" => assert_eq!(backup, "db_name = a\n"),
            other => panic!("active config is neither target: {:?}", other),
        }
    }

    #[test]
    fn aliased_roots_share_a_lock() {
        let dir = tempdir().unwrap();
        let locks = SwitchLocks::new();
        let a = locks.for_root(dir.path());
        let b = locks.for_root(&dir.path().join("."));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
