use reqwest::StatusCode;
use services::services::{board::BoardError, custom_fields::CustomFieldError, workflow::WorkflowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session was rejected and has been cleared.
    #[error("Session expired or invalid; please log in again")]
    Unauthorized,
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("Failed to reach Core PM API at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Response from {0} carried no data")]
    MissingData(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    CustomField(#[from] CustomFieldError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// HTTP status for errors the server answered, `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
