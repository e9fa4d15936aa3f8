use crate::error::TransportError;
use serde_json::Value;

/// The authenticated network layer behind a [`crate::JobClient`].
///
/// Implementations own authentication and any locking needed to refresh it.
/// A failure to obtain credentials must be reported like any other
/// transport fault.
pub trait Transport: Send + Sync {
    fn start_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError>;

    fn check_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn start_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        (**self).start_operation(endpoint, payload)
    }

    fn check_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        (**self).check_operation(endpoint, payload)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn start_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        (**self).start_operation(endpoint, payload)
    }

    fn check_operation(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        (**self).check_operation(endpoint, payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEndpoints {
    pub start: String,
    pub check: String,
}

impl OperationEndpoints {
    pub fn new(start: impl Into<String>, check: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            check: check.into(),
        }
    }
}
