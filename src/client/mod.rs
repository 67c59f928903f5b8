pub mod ssllabs;
pub mod types;

use crate::host::Host;
use std::time::Duration;
use thiserror::Error;

pub use types::{Endpoint, HostReport, Info};

/// How the client renders a finished assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// One grade line per endpoint.
    Grades,
    /// The full assessment document, passed through untouched.
    Json,
}

/// Terminal result of one assessment.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Grades(Vec<String>),
    Report(serde_json::Value),
}

/// Whether a status query returns immediately or waits for a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    NonBlocking,
    Blocking,
}

/// Concurrency headroom reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub max_assessments: u32,
    pub current_assessments: u32,
    /// Minimum pause the service asks for between new submissions.
    pub cool_off: Duration,
}

impl Capacity {
    pub fn available(&self) -> u32 {
        self.max_assessments.saturating_sub(self.current_assessments)
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("assessment failed: {0}")]
    AssessmentFailed(String),

    #[error("no terminal status after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Transient errors may succeed on a later attempt; everything else will not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::Timeout(_) => true,
            ClientError::Status { code, .. } => matches!(code, 429 | 503 | 529),
            ClientError::Decode(_) | ClientError::AssessmentFailed(_) => false,
        }
    }
}

/// The remote assessment service as seen by the scheduler.
pub trait AssessmentClient {
    fn probe_capacity(&self) -> Result<Capacity, ClientError>;
    fn start_assessment(&self, host: &Host) -> Result<(), ClientError>;
    /// `Ok(None)` means the assessment is still running.
    fn query_status(&self, host: &Host, wait: Wait) -> Result<Option<Outcome>, ClientError>;
}

impl<T: AssessmentClient + ?Sized> AssessmentClient for &T {
    fn probe_capacity(&self) -> Result<Capacity, ClientError> {
        (**self).probe_capacity()
    }

    fn start_assessment(&self, host: &Host) -> Result<(), ClientError> {
        (**self).start_assessment(host)
    }

    fn query_status(&self, host: &Host, wait: Wait) -> Result<Option<Outcome>, ClientError> {
        (**self).query_status(host, wait)
    }
}
