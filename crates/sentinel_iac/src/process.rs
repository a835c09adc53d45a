//! External tool invocation.
//!
//! Both collaborators (terraform and kubectl) are plain CLIs. This module runs
//! them to completion and captures their output; there is no timeout beyond
//! whatever the tool itself enforces.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::debug;

use crate::error::{IacError, IacResult};

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ToolOutput {
    /// Check if the tool exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        if stdout.is_empty() {
            stderr.to_string()
        } else if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{}\n{}", stdout, stderr)
        }
    }
}

/// Run `program` with `args` and wait for it to exit.
///
/// A non-zero exit is not an error here; callers inspect
/// [`ToolOutput::success`]. Only a failure to spawn is reported as
/// [`IacError::Spawn`].
pub async fn run_tool(
    program: &str,
    args: &[String],
    working_dir: Option<&Path>,
) -> IacResult<ToolOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    debug!("Executing: {}", format_command(program, args));

    let start = Instant::now();
    let output = cmd.output().await.map_err(|source| IacError::Spawn {
        program: program.to_string(),
        source,
    })?;

    Ok(ToolOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Format command for logging.
fn format_command(program: &str, args: &[String]) -> String {
    let mut cmd = program.to_string();
    for arg in args {
        if arg.contains(' ') || arg.contains('=') {
            cmd.push_str(&format!(" '{}'", arg));
        } else {
            cmd.push_str(&format!(" {}", arg));
        }
    }
    cmd
}
