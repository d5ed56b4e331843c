use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors reported by the remote API. These are the only failures the chat
/// loop recovers from; transport and local errors are not represented here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    RateLimit { message: String },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{message}")]
    Response { status: u16, message: String },
    #[error("{0}")]
    Format(String),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Short class name used when reporting the error to the user.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UnauthorizedError",
            Self::RateLimit { .. } => "RateLimitError",
            Self::Server { .. } => "ServerError",
            Self::Response { .. } => "ResponseError",
            Self::Format(_) => "FormatError",
        }
    }

    /// `<ErrorClassName>: <message>`
    pub fn report(&self) -> String {
        format!("{}: {}", self.class_name(), self)
    }

    /// Maps a non-success response to an error, preferring the JSON
    /// `error.message` field over the raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => envelope.error.message,
            Err(_) if body.trim().is_empty() => status.to_string(),
            Err(_) => body.trim().to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized { message },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimit { message },
            s if s.is_server_error() => Self::Server { status: s.as_u16(), message },
            s => Self::Response { status: s.as_u16(), message },
        }
    }
}
