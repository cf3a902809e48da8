//! Error model used by Jira gateway consumers.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JiraError>;

/// Failure categories surfaced by the gateway: HTTP errors with the combined API message, transport failures where no response arrived, payloads of an unexpected shape and client misconfiguration.
#[derive(Debug, Error)]
pub enum JiraError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Serialization(String),
    #[error("client configuration error: {0}")]
    Config(String),
}

impl JiraError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        JiraError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            JiraError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for JiraError {
    fn from(err: serde_json::Error) -> Self {
        JiraError::Serialization(err.to_string())
    }
}
