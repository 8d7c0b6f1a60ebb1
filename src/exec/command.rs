// src/exec/command.rs

//! External command invocation with failure logs.

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A failed external command, with the location of its captured output.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub message: String,
    pub log: Option<PathBuf>,
}

/// Run `program args...`, capturing its output.
///
/// On a non-zero exit (or if the program cannot be spawned) the command
/// line, the error and the raw output are written to a kept `*.log`
/// temporary file whose path is returned in the failure.
pub async fn run_or_report(program: &str, args: &[String]) -> Result<(), CommandFailure> {
    let cmdline = command_line(program, args);
    debug!(cmd = %cmdline, "running command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            let message = format!("spawning `{cmdline}`: {err}");
            return Err(CommandFailure {
                log: keep_failure_log(&cmdline, &message, &[]),
                message,
            });
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let code = output.status.code().unwrap_or(-1);
    let message = format!("`{cmdline}` exited with status {code}");
    info!(cmd = %cmdline, exit_code = code, "command failed");

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);

    Err(CommandFailure {
        log: keep_failure_log(&cmdline, &message, &combined),
        message,
    })
}

/// Run `program args...` and ignore the result entirely.
pub async fn run_ignoring_failure(program: &str, args: &[String]) {
    let cmdline = command_line(program, args);
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    debug!(cmd = %cmdline, ?status, "ran command (result ignored)");
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn keep_failure_log(cmdline: &str, message: &str, output: &[u8]) -> Option<PathBuf> {
    match write_failure_log(cmdline, message, output) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(cmd = %cmdline, error = %err, "could not write failure log");
            None
        }
    }
}

fn write_failure_log(cmdline: &str, message: &str, output: &[u8]) -> anyhow::Result<PathBuf> {
    let mut log = tempfile::Builder::new()
        .prefix("wavebuild-")
        .suffix(".log")
        .tempfile()
        .context("creating failure log")?;

    write!(log, "Error running {cmdline}: {message}\n\nOutput:\n\n")
        .context("writing failure log header")?;
    log.write_all(output).context("writing failure log output")?;

    let (_file, path) = log.keep().context("keeping failure log")?;
    Ok(path)
}
