use thiserror::*;

use super::StorageError;

#[derive(Debug, Error)]
pub enum DataStoreError {
    #[error("storage url is malformed: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported storage scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("storage returned error: {0}")]
    Storage(#[from] StorageError),
}
