use derive_more::{Display, From};

use crate::config::ConfigError;
use crate::services::StorageError;

/// Errors that can stop the controller from being assembled.
///
/// Once running, the controller reports failures through session state and
/// events instead.
#[derive(Debug, From, Display)]
pub enum Error {
    #[from]
    #[display("Config error: {_0}")]
    Config(ConfigError),

    #[from]
    #[display("Storage error: {_0}")]
    Storage(StorageError),

    #[from]
    #[display("IO error: {_0}")]
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Storage(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}
