#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize interface update: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write interface update: {0}")]
    Write(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
