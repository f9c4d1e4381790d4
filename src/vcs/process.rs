//! Shared helpers for building and running VCS child processes.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{EngineError, Result};

/// Builds a `Command` for `prefix[0] prefix[1..] args...`, matching the
/// configurable command-line prefix each driver is built with (§4.1, §6).
pub fn command<I, S>(prefix: &[String], args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(&prefix[0]);
    cmd.args(&prefix[1..]);
    cmd.args(args);
    debug!(?cmd, "built VCS command");
    cmd
}

/// Runs `cmd` to completion, forwarding its stderr to this process's stderr
/// (inherited, not captured) and failing with `ChildProcessError` on a
/// non-zero exit.
pub fn run(mut cmd: Command) -> Result<()> {
    let binary = cmd.get_program().to_string_lossy().to_string();
    let args = format_args(&cmd);
    cmd.stderr(Stdio::inherit());
    let status = cmd
        .status()
        .map_err(|e| EngineError::child_process(&binary, &args, format!("failed to start: {e}")))?;
    if !status.success() {
        return Err(EngineError::child_process(&binary, &args, format!("exited with {status}")));
    }
    Ok(())
}

/// Runs `cmd` to completion and returns its captured stdout, forwarding
/// stderr to this process's stderr.
pub fn run_capturing_stdout(mut cmd: Command) -> Result<Vec<u8>> {
    let binary = cmd.get_program().to_string_lossy().to_string();
    let args = format_args(&cmd);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit());
    let mut child = cmd
        .spawn()
        .map_err(|e| EngineError::child_process(&binary, &args, format!("failed to start: {e}")))?;
    let mut out = Vec::new();
    child
        .stdout
        .take()
        .expect("stdout was piped")
        .read_to_end(&mut out)
        .map_err(|e| EngineError::child_process(&binary, &args, format!("reading stdout: {e}")))?;
    let status = child
        .wait()
        .map_err(|e| EngineError::child_process(&binary, &args, format!("wait failed: {e}")))?;
    if !status.success() {
        return Err(EngineError::child_process(&binary, &args, format!("exited with {status}")));
    }
    Ok(out)
}

/// Runs `cmd`, captures stdout as text, and trims it -- the shape of most
/// single-line query commands (`tip`, usage probes).
pub fn run_capturing_stdout_string(cmd: Command) -> Result<String> {
    let bytes = run_capturing_stdout(cmd)?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

fn format_args(cmd: &Command) -> String {
    cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect::<Vec<_>>().join(" ")
}
