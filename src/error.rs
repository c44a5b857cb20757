use thiserror::Error;

// Failures reported by the remote poll service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("poll service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from poll service: {0}")]
    Decode(String),

    // Used by in-process collaborators that have no HTTP status to report
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("failed to encode ledger entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect push channel: {0}")]
    Connect(String),

    #[error("push channel closed")]
    Closed,

    #[error("malformed channel frame: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Question is required")]
    MissingQuestion,

    #[error("At least 2 options are required")]
    TooFewOptions,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("poll {0} not found")]
    PollNotFound(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
