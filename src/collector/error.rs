use crate::command::CommandError;

/// Errors that may occur while collecting raw machine facts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to run machine description probe: {0}")]
    Probe(#[source] CommandError),
    #[error("failed to parse machine description probe output: {0}")]
    ProbeOutput(#[source] serde_json::Error),
    #[error("failed to list {family} routes: {source}")]
    Routes {
        family: super::AddressFamily,
        #[source]
        source: CommandError,
    },
    #[error("failed to parse {family} route listing: {source}")]
    RoutesOutput {
        family: super::AddressFamily,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
