use thiserror::Error;
use warp::http::StatusCode;

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid fingerprint")]
    InvalidFingerprint,
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Too many votes, please slow down")]
    RateLimited,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl VoteError {
    pub fn status(&self) -> StatusCode {
        match self {
            VoteError::MissingField(_)
            | VoteError::InvalidFingerprint
            | VoteError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            VoteError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            VoteError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            VoteError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            VoteError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Database details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            VoteError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
