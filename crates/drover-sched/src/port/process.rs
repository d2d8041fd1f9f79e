//! Spawning child processes with in-memory capture.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{SchedError, SchedResult};
use crate::job::EXIT_UNKNOWN;
use crate::port::CommandOutput;

/// Run `program args...`, capture stdout/stderr and map the exit status.
pub(crate) async fn run<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
) -> SchedResult<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| SchedError::Transport {
            command: program.to_string(),
            message: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let exit_code = output.status.code().unwrap_or(EXIT_UNKNOWN);

    Ok(CommandOutput::new(exit_code, &stdout, &stderr))
}
