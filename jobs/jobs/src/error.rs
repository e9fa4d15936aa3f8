use crate::types::JobHandle;
use serde_json::Value;
use thiserror::Error;

/// A failure of a single transport call, before any job semantics are applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// No response was received at all.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials could not be obtained or refreshed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A response arrived but its body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// True when the remote side answered and declined, as opposed to never answering.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TransportError::Status { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("job submission did not reach the server: {0}")]
    Transport(TransportError),

    #[error("job submission rejected: {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
        body: Option<Value>,
    },
}

impl From<TransportError> for SubmissionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body } => SubmissionError::Rejected {
                status: Some(status),
                body: serde_json::from_str(&body).ok(),
                message: body,
            },
            other => SubmissionError::Transport(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    SubmissionError,
    PollTransportError,
    RemoteError,
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("status check failed: {0}")]
    PollTransport(TransportError),

    #[error("job failed: {message}")]
    Remote {
        code: Option<i64>,
        message: String,
        details: Value,
    },

    /// The operation is still running remotely; `handle` can be polled again.
    #[error("job {handle} still pending after {attempts} status checks")]
    Timeout { handle: JobHandle, attempts: u32 },

    /// `handle` is `None` when cancellation came before anything was submitted.
    #[error("job cancelled")]
    Cancelled { handle: Option<JobHandle> },
}

impl JobError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::Submission(_) => FailureKind::SubmissionError,
            JobError::PollTransport(_) => FailureKind::PollTransportError,
            JobError::Remote { .. } => FailureKind::RemoteError,
            JobError::Timeout { .. } => FailureKind::Timeout,
            JobError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, JobError::Submission(SubmissionError::Rejected { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing config key: {0}")]
    Missing(String),

    #[error("Invalid value for config key {key}: {value}")]
    Invalid { key: String, value: String },
}
