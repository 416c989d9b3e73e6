use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} ({kind}, status {status})")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },
    #[error("invalid api url: {0}")]
    Url(#[from] url::ParseError),
}
