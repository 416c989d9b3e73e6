use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("content is missing")]
    MissingContent,
    #[error("content must not be blank")]
    BlankContent,
    #[error("task id must be an integer, got {0:?}")]
    InvalidTaskId(String),
}
