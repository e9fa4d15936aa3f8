//! Where provider responses keep the fields the poll loop cares about.
//!
//! Every location is a JSON pointer (RFC 6901), so the same client can drive
//! providers whose operation objects are shaped differently.

use crate::types::{JobHandle, JobStatus, RemoteFailure};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRules {
    /// Pointer to the operation name in the submission response.
    pub operation_name: String,
    /// Pointer to the boolean completion flag in a status response.
    pub done: String,
    /// Pointer to the error object in a status response.
    pub error: String,
    /// Pointer to the message, relative to the error object.
    pub error_message: String,
    /// Pointer to the numeric code, relative to the error object.
    pub error_code: String,
    /// Pointer to the success payload; `None` keeps the whole status response.
    pub response: Option<String>,
    /// Key under which the handle is sent in the status-check payload.
    pub handle_field: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            operation_name: "/name".to_string(),
            done: "/done".to_string(),
            error: "/error".to_string(),
            error_message: "/message".to_string(),
            error_code: "/code".to_string(),
            response: Some("/response".to_string()),
            handle_field: "operationName".to_string(),
        }
    }
}

impl ExtractionRules {
    pub fn with_operation_name(mut self, pointer: impl Into<String>) -> Self {
        self.operation_name = pointer.into();
        self
    }

    pub fn with_done(mut self, pointer: impl Into<String>) -> Self {
        self.done = pointer.into();
        self
    }

    pub fn with_error(mut self, pointer: impl Into<String>) -> Self {
        self.error = pointer.into();
        self
    }

    pub fn with_error_message(mut self, pointer: impl Into<String>) -> Self {
        self.error_message = pointer.into();
        self
    }

    pub fn with_response(mut self, pointer: Option<String>) -> Self {
        self.response = pointer;
        self
    }

    pub fn with_handle_field(mut self, field: impl Into<String>) -> Self {
        self.handle_field = field.into();
        self
    }

    pub fn operation_name(&self, response: &Value) -> Option<JobHandle> {
        response
            .pointer(&self.operation_name)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(JobHandle::new)
    }

    pub fn check_payload(&self, handle: &JobHandle) -> Value {
        let mut payload = Map::new();
        payload.insert(
            self.handle_field.clone(),
            Value::String(handle.as_str().to_string()),
        );
        Value::Object(payload)
    }

    /// A missing or non-boolean `done` counts as still pending.
    pub fn status(&self, response: &Value) -> JobStatus {
        let done = response
            .pointer(&self.done)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !done {
            return JobStatus::Pending;
        }

        match response.pointer(&self.error).filter(|error| !error.is_null()) {
            Some(error) => JobStatus::Done(Err(self.remote_failure(error))),
            None => JobStatus::Done(Ok(self.success_payload(response))),
        }
    }

    fn remote_failure(&self, error: &Value) -> RemoteFailure {
        let message = match error.pointer(&self.error_message) {
            Some(Value::String(message)) => message.clone(),
            _ => match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            },
        };
        RemoteFailure {
            code: error.pointer(&self.error_code).and_then(Value::as_i64),
            message,
            details: error.clone(),
        }
    }

    fn success_payload(&self, response: &Value) -> Value {
        match &self.response {
            Some(pointer) => response.pointer(pointer).cloned().unwrap_or(Value::Null),
            None => response.clone(),
        }
    }
}
