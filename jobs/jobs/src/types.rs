use crate::error::{JobError, SubmissionError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Opaque payload submitted to a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRequest {
    payload: Map<String, Value>,
}

impl JobRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// Fails with the original value when it is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(payload) => Ok(Self { payload }),
            other => Err(other),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The provider's account of why a finished job failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFailure {
    pub code: Option<i64>,
    pub message: String,
    pub details: Value,
}

impl From<RemoteFailure> for JobError {
    fn from(failure: RemoteFailure) -> Self {
        JobError::Remote {
            code: failure.code,
            message: failure.message,
            details: failure.details,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Done(Result<Value, RemoteFailure>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub payload: Value,
    /// Number of status checks performed, including the one that saw completion.
    pub attempts: u32,
}

pub type JobResult = Result<JobOutput, JobError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Submitted,
    Pending,
    Succeeded,
    Failed,
    Rejected,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            JobState::Created | JobState::Submitted | JobState::Pending
        )
    }

    pub fn of(result: &JobResult) -> Self {
        match result {
            Ok(_) => JobState::Succeeded,
            Err(JobError::Submission(SubmissionError::Rejected { .. })) => JobState::Rejected,
            Err(JobError::Submission(SubmissionError::Transport(_)))
            | Err(JobError::PollTransport(_))
            | Err(JobError::Remote { .. }) => JobState::Failed,
            Err(JobError::Timeout { .. }) => JobState::TimedOut,
            Err(JobError::Cancelled { .. }) => JobState::Cancelled,
        }
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Created => "created",
            JobState::Submitted => "submitted",
            JobState::Pending => "pending",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Rejected => "rejected",
            JobState::TimedOut => "timed out",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use serde_json::json;

    #[test]
    fn request_builder_keeps_insertion() {
        let request = JobRequest::new()
            .with("instances", json!([{"prompt": "a lion"}]))
            .with("parameters", json!({"sampleCount": 1}));
        assert_eq!(request.get("parameters"), Some(&json!({"sampleCount": 1})));
        assert_eq!(
            request.to_value(),
            json!({"instances": [{"prompt": "a lion"}], "parameters": {"sampleCount": 1}})
        );
    }

    #[test]
    fn non_object_values_are_refused() {
        assert_eq!(JobRequest::from_value(json!([1, 2])), Err(json!([1, 2])));
    }

    #[test]
    fn terminal_states_follow_outcomes() {
        let rejected: JobResult = Err(JobError::Submission(SubmissionError::Rejected {
            status: Some(400),
            message: "bad".into(),
            body: None,
        }));
        let unreachable: JobResult = Err(JobError::Submission(SubmissionError::Transport(
            TransportError::Network("down".into()),
        )));
        let ok: JobResult = Ok(JobOutput {
            payload: json!({}),
            attempts: 1,
        });

        assert_eq!(JobState::of(&rejected), JobState::Rejected);
        assert_eq!(JobState::of(&unreachable), JobState::Failed);
        assert_eq!(JobState::of(&ok), JobState::Succeeded);
        assert_eq!(
            JobState::of(&Err(JobError::Timeout {
                handle: JobHandle::new("operations/1"),
                attempts: 2
            })),
            JobState::TimedOut
        );
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }
}
