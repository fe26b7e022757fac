use thiserror::Error;

/// Failure talking to the Freddie backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's `error` or `message` field.
    #[error("backend returned {status}: {}", message.as_deref().unwrap_or("no details"))]
    Remote { status: u16, message: Option<String> },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for a toast, when the server supplied one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ApiError::Remote {
                message: Some(m), ..
            } => Some(m.as_str()),
            _ => None,
        }
    }

    /// The server's message, or `fallback` when there is none.
    pub fn user_message_or(&self, fallback: &str) -> String {
        self.user_message().unwrap_or(fallback).to_string()
    }
}
