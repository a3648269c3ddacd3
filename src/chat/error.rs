/// Failures that end a turn. Recoverable stream problems never get this far.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("HTTP error with the status: {status} {reason}")]
    Upstream { status: u16, reason: String },

    #[error("request to the completion endpoint failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("response stream was interrupted: {0}")]
    Interrupted(#[from] std::io::Error),

    #[error("completion response is not valid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("completion response has no message content")]
    MissingContent,
}

pub type ChatResult<T> = Result<T, ChatError>;
