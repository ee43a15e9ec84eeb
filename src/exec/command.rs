// src/exec/command.rs

//! Running external commands (bundler, linters).

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::BuildloopError;

/// Exit status and captured stderr of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmdline: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmdline);
        c
    }
}

/// Run `cmd` to completion in `cwd`.
///
/// stdout is logged line by line at debug level; stderr is logged the same
/// way and also collected into [`CommandOutput::stderr`].
pub async fn run_command(label: &str, mut cmd: Command, cwd: &Path) -> Result<CommandOutput> {
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{}'", label))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_label = label.to_string();
    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            drain_lines(&stdout_label, "stdout", stdout).await;
        }
    });

    let stderr_label = label.to_string();
    let stderr_task = tokio::spawn(async move {
        match stderr {
            Some(stderr) => drain_lines(&stderr_label, "stderr", stderr).await,
            None => String::new(),
        }
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of '{}'", label))?;

    let _ = stdout_task.await;
    let stderr = stderr_task.await.unwrap_or_default();

    info!(
        command = %label,
        exit_code = ?status.code(),
        success = status.success(),
        "process exited"
    );

    Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        stderr,
    })
}

async fn drain_lines<R>(label: &str, stream: &'static str, reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut collected = String::new();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(command = %label, stream, "{}", line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

/// Run a lint/validation command line through the shell.
///
/// A non-zero exit status becomes [`BuildloopError::ValidationError`]; an
/// empty command line means the check is disabled.
pub async fn run_check(task: &str, cmdline: &str, cwd: &Path) -> crate::errors::Result<()> {
    let cmdline = cmdline.trim();
    if cmdline.is_empty() {
        info!(task = %task, "no command configured; skipping");
        return Ok(());
    }

    info!(task = %task, cmd = %cmdline, "running check");
    let output = run_command(task, shell_command(cmdline), cwd).await?;

    if output.success {
        Ok(())
    } else {
        let message = match output.code {
            Some(code) => format!("'{}' exited with status {}", cmdline, code),
            None => format!("'{}' was terminated by a signal", cmdline),
        };
        Err(BuildloopError::ValidationError {
            task: task.to_string(),
            message,
        })
    }
}
