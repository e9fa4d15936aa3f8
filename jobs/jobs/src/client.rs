use crate::cancel::{CancellablePause, CancellationToken, Pause};
use crate::error::{JobError, SubmissionError};
use crate::policy::PollPolicy;
use crate::rules::ExtractionRules;
use crate::transport::{OperationEndpoints, Transport};
use crate::types::{JobHandle, JobOutput, JobRequest, JobResult, JobStatus};
use log::{debug, info, trace, warn};

/// Turns a submit-now, finishes-later remote API into a bounded blocking call.
///
/// The client keeps no state between calls. Share one instance (or its
/// transport) between threads and run each job on its own thread.
pub struct JobClient<T> {
    transport: T,
    endpoints: OperationEndpoints,
    rules: ExtractionRules,
    pause: Box<dyn Pause>,
}

impl<T: Transport> JobClient<T> {
    pub fn new(transport: T, endpoints: OperationEndpoints) -> Self {
        Self {
            transport,
            endpoints,
            rules: ExtractionRules::default(),
            pause: Box::new(CancellablePause),
        }
    }

    pub fn with_rules(mut self, rules: ExtractionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_pause(mut self, pause: impl Pause + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoints(&self) -> &OperationEndpoints {
        &self.endpoints
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// Submits once. Resubmitting may create a duplicate job, so nothing here retries.
    pub fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmissionError> {
        trace!("Submitting job to {}", self.endpoints.start);

        let response = self
            .transport
            .start_operation(&self.endpoints.start, &request.to_value())
            .map_err(SubmissionError::from)?;

        match self.rules.operation_name(&response) {
            Some(handle) => {
                info!("Job submitted, operation: {handle}");
                Ok(handle)
            }
            None => {
                warn!("Submission response has no operation name at {}", self.rules.operation_name);
                Err(SubmissionError::Rejected {
                    status: None,
                    message: format!(
                        "response did not contain an operation name at {}",
                        self.rules.operation_name
                    ),
                    body: Some(response),
                })
            }
        }
    }

    pub fn poll(&self, handle: &JobHandle, policy: &PollPolicy) -> JobResult {
        self.poll_with_cancel(handle, policy, &CancellationToken::new())
    }

    pub fn poll_with_cancel(
        &self,
        handle: &JobHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> JobResult {
        let payload = self.rules.check_payload(handle);
        let max_attempts = policy.max_attempts();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                info!("Polling of {handle} cancelled before check {attempt}");
                return Err(JobError::Cancelled {
                    handle: Some(handle.clone()),
                });
            }

            debug!("Checking {handle}, attempt {attempt}/{max_attempts}");
            let response = self
                .transport
                .check_operation(&self.endpoints.check, &payload)
                .map_err(|err| {
                    warn!("Status check for {handle} failed, giving up: {err}");
                    JobError::PollTransport(err)
                })?;

            match self.rules.status(&response) {
                JobStatus::Done(Ok(payload)) => {
                    info!("Operation {handle} completed after {attempt} checks");
                    return Ok(JobOutput {
                        payload,
                        attempts: attempt,
                    });
                }
                JobStatus::Done(Err(failure)) => {
                    warn!("Operation {handle} failed: {}", failure.message);
                    return Err(failure.into());
                }
                JobStatus::Pending => {}
            }

            if attempt < max_attempts && self.pause.pause(policy.interval(), cancel) {
                info!("Polling of {handle} cancelled while waiting");
                return Err(JobError::Cancelled {
                    handle: Some(handle.clone()),
                });
            }
        }

        warn!(
            "Operation {handle} did not complete within {max_attempts} checks ({:?})",
            policy.max_wait()
        );
        Err(JobError::Timeout {
            handle: handle.clone(),
            attempts: max_attempts,
        })
    }

    pub fn submit_and_await(&self, request: &JobRequest, policy: &PollPolicy) -> JobResult {
        self.submit_and_await_with_cancel(request, policy, &CancellationToken::new())
    }

    pub fn submit_and_await_with_cancel(
        &self,
        request: &JobRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> JobResult {
        if cancel.is_cancelled() {
            info!("Job cancelled before submission");
            return Err(JobError::Cancelled { handle: None });
        }

        let handle = self.submit(request)?;
        self.poll_with_cancel(&handle, policy, cancel)
    }
}
