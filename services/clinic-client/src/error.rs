use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Server rejected the call; `message` is shown to the user as-is.
    #[error("{message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("durable storage error: {0}")]
    Storage(String),
    #[error("invalid data: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("token could not be decoded: {0}")]
    InvalidToken(String),
    #[error("session has expired")]
    Expired,
    #[error("token does not match the returned user")]
    TokenMismatch,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("session was already restored")]
    AlreadyRestored,
    #[error("session has not been restored yet")]
    NotRestored,
    #[error("not signed in")]
    NotAuthenticated,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
