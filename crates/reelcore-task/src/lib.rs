//! One-shot background computation over an isolated worker thread.
//!
//! The caller dispatches a [`PrimeLimit`] and gets a [`PendingTask`] back right
//! away. The worker thread owns the computation; the only things crossing the
//! boundary are the request message and a single response.

mod channel;
mod limit;
mod primes;
mod worker;

use serde::{Deserialize, Serialize};

pub use channel::{ChannelState, PendingTask, TaskChannel, TaskPhase};
pub use limit::PrimeLimit;
pub use primes::is_prime;

pub type RequestId = u64;

/// `last_match` value when no prime was found.
pub const NO_MATCH: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimeReport {
    pub match_count: u64,
    pub last_match: i64,
    pub elapsed_millis: f64,
}

impl PrimeReport {
    pub fn last_prime(&self) -> Option<u64> {
        u64::try_from(self.last_match).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed {
        request_id: RequestId,
        report: PrimeReport,
    },
    Cancelled {
        request_id: RequestId,
    },
}

impl TaskOutcome {
    pub fn request_id(&self) -> RequestId {
        match self {
            TaskOutcome::Completed { request_id, .. } | TaskOutcome::Cancelled { request_id } => {
                *request_id
            }
        }
    }

    pub fn report(&self) -> Option<&PrimeReport> {
        match self {
            TaskOutcome::Completed { report, .. } => Some(report),
            TaskOutcome::Cancelled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("background worker is not running")]
    WorkerUnavailable,
    #[error("request {request_id} faulted: {message}")]
    Faulted {
        request_id: RequestId,
        message: String,
    },
    #[error("response for request {request_id} was already taken")]
    ResponseTaken { request_id: RequestId },
}
