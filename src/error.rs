/// Errors that fail a collection cycle or agent start-up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] crate::config::Error),
    #[error(transparent)]
    Collector(#[from] crate::collector::Error),
    #[error(transparent)]
    Environment(#[from] crate::environment::Error),
    #[error(transparent)]
    Lease(#[from] crate::lease::Error),
    #[error(transparent)]
    Topology(#[from] crate::topology::Error),
    #[error(transparent)]
    Identity(#[from] crate::identity::Error),
    #[error(transparent)]
    Rpc(#[from] crate::rpc::Error),
    #[error("collection cycle was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Logs the error at error level and discards it.
    fn ok_log(self) -> Option<T>;

    /// Logs the error at `level` and discards it.
    fn ok_log_at(self, level: log::Level) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        self.ok_log_at(log::Level::Error)
    }

    fn ok_log_at(self, level: log::Level) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::log!(level, "{err}");
                None
            }
        }
    }
}
