use genmedia_jobs::error::ConfigError;
use genmedia_jobs::{JobError, TransportError};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VertexError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn invalid_input(message: impl AsRef<str>) -> VertexError {
    VertexError::InvalidInput(message.as_ref().to_string())
}

pub fn empty_response(message: impl AsRef<str>) -> VertexError {
    VertexError::EmptyResponse(message.as_ref().to_string())
}

pub fn from_reqwest_error(details: impl AsRef<str>, err: reqwest::Error) -> TransportError {
    if err.is_decode() {
        TransportError::Decode(format!("{}: {err}", details.as_ref()))
    } else if err.is_timeout() {
        TransportError::Network(format!("{}: timeout", details.as_ref()))
    } else {
        TransportError::Network(format!("{}: {err}", details.as_ref()))
    }
}

pub fn transport_error_from_status(status: StatusCode, body: impl Into<String>) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        body: body.into(),
    }
}
