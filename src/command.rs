//! Cancellable subprocess execution.
//!
//! Every external tool the agent calls (`machine-resources`, `ip`,
//! `systemd-detect-virt`) goes through [`run`], which races the child against
//! the cycle's [`CancellationToken`] and a deadline. The child is killed when
//! its future is dropped, so a cancelled cycle does not leave stragglers.
use std::process::{ExitStatus, Output};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Errors that may occur while running an external command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
    #[error("`{command}` failed with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Renders a command line for logs and error messages.
pub fn describe(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `cmd` to completion and returns its raw output, whatever the exit status.
///
/// # Errors
///
/// - [`CommandError::Cancelled`] if `token` fires first.
/// - [`CommandError::Timeout`] if the command outlives `timeout`.
/// - [`CommandError::Spawn`] if the process cannot be started.
pub async fn run(
    token: &CancellationToken,
    mut cmd: Command,
    timeout: Duration,
) -> Result<Output, CommandError> {
    cmd.kill_on_drop(true);
    let command = describe(&cmd);
    log::trace!("Running `{command}`");

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CommandError::Cancelled { command }),
        res = tokio::time::timeout(timeout, cmd.output()) => match res {
            Err(_) => Err(CommandError::Timeout { command, timeout }),
            Ok(Err(source)) => Err(CommandError::Spawn { command, source }),
            Ok(Ok(output)) => Ok(output),
        },
    }
}

/// Like [`run`], but treats a non-zero exit status as an error and returns stdout.
///
/// # Errors
///
/// Everything [`run`] returns, plus [`CommandError::ExitStatus`].
pub async fn run_checked(
    token: &CancellationToken,
    cmd: Command,
    timeout: Duration,
) -> Result<Vec<u8>, CommandError> {
    let command = describe(&cmd);
    let output = run(token, cmd, timeout).await?;
    if !output.status.success() {
        return Err(CommandError::ExitStatus {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(output.stdout)
}
