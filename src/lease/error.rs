use std::path::PathBuf;

/// Errors that may occur during DHCP lease discovery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list processes in `{path}`: {source}")]
    ReadProcRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read process file `{path}`: {source}")]
    ReadProcessFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lease discovery was cancelled")]
    Cancelled,
    #[error("lease discovery task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
