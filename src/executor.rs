// Odoo MCP Gate - Command Executor
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Runs one shell command line inside a profile root with an output
// ceiling and a wall-clock ceiling. Outcome policy:
//   exit 0                      -> succeeded
//   exit != 0 with stdout       -> completed with output (not an error)
//   timeout with stdout         -> completed with output, timed_out = true
//   spawn error / no stdout     -> hard failure (ToolError)
// A timeout kills the command's whole process group.

use std::borrow::Cow;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{EnvironmentProfile, ServerConfig};
use crate::error::ToolError;

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long to wait for pipe readers after the child is gone. Grandchildren
/// that inherited stdout can hold the pipe open past the kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
/// stderr is only kept for diagnostics
const STDERR_KEEP: usize = 64 * 1024;

/// Normalized result of one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub succeeded: bool,
    pub stdout: String,
    /// Output hit the size ceiling; the rest was discarded
    pub truncated: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    /// Text handed back to the caller, with notes for cut-short output
    pub fn text(&self) -> String {
        let mut text = self.stdout.clone();
        if self.truncated {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("[output truncated]");
        }
        if self.timed_out {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("[command timed out]");
        }
        text
    }
}

/// Seam between handlers and the process table. Tests swap in a recorder.
pub trait CommandRunner: Send + Sync {
    fn run(&self, profile: &EnvironmentProfile, command_line: &str) -> Result<CommandOutcome, ToolError>;
}

/// `sh -c` executor with bounded output and bounded time
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    max_output: usize,
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(max_output: usize, timeout: Duration) -> Self {
        Self { max_output, timeout }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.max_output_bytes, Duration::from_secs(config.command_timeout_secs))
    }
}

/// Output collected by a pipe reader thread
#[derive(Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Drain a pipe to EOF, keeping at most `limit` bytes. Signals `done` at EOF.
fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
    limit: usize,
    sink: Arc<Mutex<Captured>>,
    done: mpsc::Sender<()>,
) {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            let n = match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if let Ok(mut cap) = sink.lock() {
                let room = limit.saturating_sub(cap.bytes.len());
                if n > room {
                    cap.truncated = true;
                }
                let keep = n.min(room);
                cap.bytes.extend_from_slice(&chunk[..keep]);
            }
        }
        let _ = done.send(());
    });
}

fn take_captured(sink: &Arc<Mutex<Captured>>) -> Captured {
    match sink.lock() {
        Ok(mut cap) => std::mem::take(&mut *cap),
        Err(_) => Captured::default(),
    }
}

/// Put the shell in a fresh process group so a timeout reaches everything it started
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// SIGKILL the child's whole process group, then the child itself
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // group id == shell pid because of process_group(0)
            unsafe { libc::kill(-pgid, libc::SIGKILL) };
        }
    }
    let _ = child.kill();
}

impl CommandRunner for ShellExecutor {
    fn run(&self, profile: &EnvironmentProfile, command_line: &str) -> Result<CommandOutcome, ToolError> {
        log::info!("[Executing] {} (cwd {:?})", command_line, profile.root);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command_line)
            .current_dir(&profile.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut cmd);
        let mut child = cmd
            .spawn()
            .map_err(|e| {
                log::warn!("[Command Error] {}: {}", command_line, e);
                ToolError::CommandLaunchFailure {
                    command: command_line.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let (done_tx, done_rx) = mpsc::channel();
        let stdout_sink = Arc::new(Mutex::new(Captured::default()));
        let stderr_sink = Arc::new(Mutex::new(Captured::default()));
        let mut readers = 0;
        if let Some(out) = child.stdout.take() {
            spawn_reader(out, self.max_output, Arc::clone(&stdout_sink), done_tx.clone());
            readers += 1;
        }
        if let Some(err) = child.stderr.take() {
            spawn_reader(err, STDERR_KEEP, Arc::clone(&stderr_sink), done_tx.clone());
            readers += 1;
        }
        drop(done_tx);

        let deadline = Instant::now() + self.timeout;
        let mut timed_out = false;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        timed_out = true;
                        kill_tree(&mut child);
                        break child.wait().ok();
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    log::warn!("[Command Error] wait failed for {}: {}", command_line, e);
                    kill_tree(&mut child);
                    break child.wait().ok();
                }
            }
        };

        let grace_end = Instant::now() + DRAIN_GRACE;
        for _ in 0..readers {
            let left = grace_end.saturating_duration_since(Instant::now());
            if done_rx.recv_timeout(left).is_err() {
                log::warn!("[Command] output pipes still open after exit: {}", command_line);
                break;
            }
        }

        let out = take_captured(&stdout_sink);
        let err = take_captured(&stderr_sink);
        let stdout = String::from_utf8_lossy(&out.bytes).into_owned();
        let stderr = String::from_utf8_lossy(&err.bytes).into_owned();
        let exit_code = status.and_then(|s| s.code());
        let exited_ok = !timed_out && status.map(|s| s.success()).unwrap_or(false);

        if !stderr.trim().is_empty() {
            log::debug!("[STDERR] {}", stderr.trim_end());
        }
        if out.truncated {
            log::warn!("[Command] output truncated at {} bytes: {}", self.max_output, command_line);
        }

        if exited_ok {
            log::info!("[Success] Command completed");
            return Ok(CommandOutcome {
                succeeded: true,
                stdout,
                truncated: out.truncated,
                timed_out: false,
                exit_code,
            });
        }

        if stdout.is_empty() {
            if timed_out {
                log::warn!("[Command Error] timed out after {}s: {}", self.timeout.as_secs(), command_line);
                return Err(ToolError::CommandTimeout {
                    command: command_line.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
            let reason = match exit_code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            let reason = match stderr.trim() {
                "" => reason,
                detail => format!("{}: {}", reason, detail),
            };
            log::warn!("[Command Error] {}: {}", command_line, reason);
            return Err(ToolError::CommandLaunchFailure {
                command: command_line.to_string(),
                reason,
            });
        }

        log::warn!(
            "[Command] {} finished with {} but produced output; returning it",
            command_line,
            if timed_out { "timeout".to_string() } else { format!("exit {:?}", exit_code) }
        );
        Ok(CommandOutcome {
            succeeded: false,
            stdout,
            truncated: out.truncated,
            timed_out,
            exit_code,
        })
    }
}

/// Quote one argument for `sh -c`. Plain module lists pass through as-is.
pub fn shell_quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_,.:/=@+-".contains(c));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}


// ============================================================================
// TESTS
// ============================================================================
