pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod policy;
pub mod rules;
pub mod transport;
pub mod types;

pub use cancel::{CancellablePause, CancellationToken, Pause};
pub use client::JobClient;
pub use error::{FailureKind, JobError, PolicyError, SubmissionError, TransportError};
pub use policy::PollPolicy;
pub use rules::ExtractionRules;
pub use transport::{OperationEndpoints, Transport};
pub use types::{JobHandle, JobOutput, JobRequest, JobResult, JobState, JobStatus, RemoteFailure};

use std::cell::RefCell;
use std::str::FromStr;

pub struct LoggingState {
    logging_initialized: bool,
}

impl LoggingState {
    /// Installs `env_logger` once, with the level taken from `GENMEDIA_JOBS_LOG`.
    pub fn init(&mut self) {
        if !self.logging_initialized {
            let max_level: log::LevelFilter =
                log::LevelFilter::from_str(&std::env::var("GENMEDIA_JOBS_LOG").unwrap_or_default())
                    .unwrap_or(log::LevelFilter::Info);
            // A logger installed by the host application keeps its own level.
            if env_logger::Builder::new()
                .filter_level(max_level)
                .try_init()
                .is_ok()
            {
                log::set_max_level(max_level);
            }
            self.logging_initialized = true;
        }
    }
}

thread_local! {
    pub static LOGGING_STATE: RefCell<LoggingState> = const { RefCell::new(LoggingState {
        logging_initialized: false,
    }) };
}
