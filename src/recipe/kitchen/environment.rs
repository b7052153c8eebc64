// src/recipe/kitchen/environment.rs

//! Build environment preparation and command execution

use crate::error::{Error, Result};
use crate::recipe::format::EnvOverride;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Number of log lines included in a failed step's error
const LOG_TAIL_LINES: usize = 20;

/// Compute the effective environment from a base and the recipe overrides
///
/// `Set` replaces a variable. `Append` adds to the existing value after a
/// single space; an absent or empty variable counts as the empty string.
pub fn prepare(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, EnvOverride>,
) -> BTreeMap<String, String> {
    let mut env = base.clone();

    for (name, change) in overrides {
        let value = match change {
            EnvOverride::Set(value) => value.clone(),
            EnvOverride::Append(value) => match env.get(name) {
                Some(current) if !current.is_empty() => format!("{} {}", current, value),
                _ => value.clone(),
            },
        };
        debug!("{}={}", name, value);
        env.insert(name.clone(), value);
    }

    env
}

/// Run a build command with exactly `env` as its environment
///
/// Output goes to `log_path`. A spawn failure, a non-zero exit or running past
/// `timeout` is an [`Error::ExecError`]; the error carries the end of the log.
pub fn run(
    command: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    cwd: &Path,
    timeout: Option<Duration>,
    log_path: &Path,
) -> Result<ExitStatus> {
    let command_line = if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    };
    let exec_err = |reason: String| Error::ExecError {
        command: command_line.clone(),
        reason,
    };

    info!("Running: {}", command_line);
    debug!("cwd={} vars={}", cwd.display(), env.len());

    let stdout = File::create(log_path).map_err(|e| Error::io(log_path, e))?;
    let stderr = stdout.try_clone().map_err(|e| Error::io(log_path, e))?;

    let mut child = Command::new(command)
        .args(args)
        .env_clear()
        .envs(env)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(|e| exec_err(format!("failed to spawn: {}", e)))?;

    let status = match timeout {
        Some(limit) => match child
            .wait_timeout(limit)
            .map_err(|e| exec_err(format!("failed to wait: {}", e)))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(exec_err(format!(
                    "timed out after {} seconds{}",
                    limit.as_secs(),
                    log_tail(log_path)
                )));
            }
        },
        None => child
            .wait()
            .map_err(|e| exec_err(format!("failed to wait: {}", e)))?,
    };

    if !status.success() {
        let code = status
            .code()
            .map_or_else(|| "a signal".to_string(), |c| format!("exit code {}", c));
        let tail = log_tail(log_path);
        warn!("{} failed with {}", command_line, code);
        return Err(exec_err(format!("terminated with {}{}", code, tail)));
    }

    Ok(status)
}

/// Last lines of a step log, formatted for an error message
fn log_tail(log_path: &Path) -> String {
    let Ok(content) = fs::read_to_string(log_path) else {
        return String::new();
    };

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    format!("\n{}", lines[start..].join("\n"))
}
