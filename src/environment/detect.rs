use std::ffi::OsString;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{Error, Result};
use crate::command;

/// Exit status of `systemd-detect-virt` when no virtualization was found.
const NOT_VIRTUALIZED_EXIT_CODE: i32 = 1;

/// Available runtime environments for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running directly on the host (or a full virtual machine).
    Host,
    /// Running inside a container (LXD, Docker, systemd-nspawn, ...).
    Container,
}

impl RuntimeEnvironment {
    pub fn is_container(self) -> bool {
        self == RuntimeEnvironment::Container
    }
}

/// Determines whether the agent runs inside a container.
///
/// Detection is delegated to `systemd-detect-virt --container`: exit code 0
/// means a container was detected, exit code 1 means none was, anything else
/// is an error. Nothing is cached here; callers hold on to the answer for at
/// most one collection cycle.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    program: OsString,
    args: Vec<OsString>,
    timeout: Duration,
}

impl RuntimeContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_command("systemd-detect-virt", ["--container"], timeout)
    }

    /// Uses an alternative detection command with the same exit-code contract.
    pub fn with_command<I, S>(program: impl Into<OsString>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Runs the detection command.
    ///
    /// # Errors
    ///
    /// * [`Error::Command`] if the command cannot run, times out or is cancelled.
    /// * [`Error::UnexpectedExit`] for any exit status other than 0 or 1.
    pub async fn detect(&self, token: &CancellationToken) -> Result<RuntimeEnvironment> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let described = command::describe(&cmd);

        let output = command::run(token, cmd, self.timeout)
            .await
            .map_err(Error::Command)?;

        match output.status.code() {
            Some(0) => {
                log::debug!(
                    "Running in container `{}`",
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                Ok(RuntimeEnvironment::Container)
            }
            Some(NOT_VIRTUALIZED_EXIT_CODE) => Ok(RuntimeEnvironment::Host),
            code => Err(Error::UnexpectedExit {
                command: described,
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            }),
        }
    }

    /// Shorthand for `detect(token)?.is_container()`.
    ///
    /// # Errors
    ///
    /// See [`RuntimeContext::detect`].
    pub async fn is_container(&self, token: &CancellationToken) -> Result<bool> {
        Ok(self.detect(token).await?.is_container())
    }
}
