//! Cache errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_yaml::Error),
}

impl From<CacheError> for halscan_core::Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::IoError(e) => halscan_core::Error::Io(e),
            CacheError::SerializeError(e) => halscan_core::Error::Cache(e.to_string()),
        }
    }
}
