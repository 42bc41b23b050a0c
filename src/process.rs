//! Async execution of external tools (ffmpeg, ffprobe, engine commands).
//!
//! Children are spawned with `kill_on_drop`, so a caller that abandons the
//! future (for example on timeout) also terminates the process.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Maximum stderr characters carried into error messages.
pub const STDERR_TAIL_CHARS: usize = 400;

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Human-readable failure summary: exit status plus the tail of stderr.
    pub fn failure_message(&self, program: &str) -> String {
        let stderr = tail(self.stderr.trim(), STDERR_TAIL_CHARS);
        if stderr.is_empty() {
            format!("{} exited with {}", program, self.status)
        } else {
            format!("{} exited with {}: {}", program, self.status, stderr)
        }
    }
}

/// Runs `program` with `args` and captures its output.
///
/// Stdin is closed. Returns the raw spawn error so callers can classify
/// `NotFound` and `PermissionDenied` into their own error variants.
pub async fn run_tool(program: &str, args: &[String], cwd: Option<&Path>) -> io::Result<ToolOutput> {
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

    tracing::debug!(program, ?args, "running external tool");
    let output = command.output().await?;

    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Last `max_chars` characters of `text`, respecting char boundaries.
pub fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// First `max_chars` characters of `text`, respecting char boundaries.
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
