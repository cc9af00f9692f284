use std::path::PathBuf;

use crate::command::CommandError;
use crate::fsutil;

/// Errors that may occur during environment detection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to run virtualization detection: {0}")]
    Command(#[source] CommandError),
    #[error("`{command}` exited with unexpected status {code:?}: {stderr}")]
    UnexpectedExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
