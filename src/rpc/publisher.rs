use std::io::Write;
use std::sync::Mutex;

use super::messages::UpdateInterfaces;
use super::{Error, Result};

/// Delivers interface updates to the region controller.
pub trait Publisher {
    fn publish(
        &self,
        message: &UpdateInterfaces,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Writes every update as one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesPublisher<W> {
    writer: Mutex<W>,
}

pub type StdoutPublisher = JsonLinesPublisher<std::io::Stdout>;

impl StdoutPublisher {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_line(&self, message: &UpdateInterfaces) -> Result<()> {
        let mut line = serde_json::to_vec(message).map_err(Error::Serialize)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writer.write_all(&line).map_err(Error::Write)?;
        writer.flush().map_err(Error::Write)
    }
}

impl<W: Write + Send> Publisher for JsonLinesPublisher<W> {
    fn publish(
        &self,
        message: &UpdateInterfaces,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        std::future::ready(self.write_line(message))
    }
}
