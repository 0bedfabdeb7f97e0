use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::primes::count_primes_interruptible;
use crate::{PrimeLimit, PrimeReport, RequestId, TaskError, TaskOutcome};

pub(crate) type Response = Result<TaskOutcome, TaskError>;

/// The computation run on the worker. `None` means it observed `interrupted`.
pub(crate) type Kernel = fn(PrimeLimit, u64, &dyn Fn() -> bool) -> Option<PrimeReport>;

pub(crate) struct TaskRequest {
    pub(crate) request_id: RequestId,
    pub(crate) limit: PrimeLimit,
    pub(crate) cancel: CancellationToken,
    pub(crate) respond: oneshot::Sender<Response>,
}

pub(crate) fn prime_kernel(
    limit: PrimeLimit,
    check_interval: u64,
    interrupted: &dyn Fn() -> bool,
) -> Option<PrimeReport> {
    count_primes_interruptible(limit, check_interval, interrupted)
}

/// Runs requests in arrival order until every sender is gone.
///
/// A request stops when its own token or `shutdown` is cancelled, so once
/// `shutdown` fires the remaining queue drains as `Cancelled` responses.
pub(crate) fn spawn_task_worker(
    kernel: Kernel,
    cancel_check_interval: u64,
    shutdown: CancellationToken,
    in_flight: Arc<AtomicUsize>,
) -> std::io::Result<(mpsc::Sender<TaskRequest>, thread::JoinHandle<()>)> {
    let (request_tx, request_rx) = mpsc::channel::<TaskRequest>();

    let handle = thread::Builder::new()
        .name("reel-task-worker".to_string())
        .spawn(move || {
            while let Ok(TaskRequest {
                request_id,
                limit,
                cancel,
                respond,
            }) = request_rx.recv()
            {
                let interrupted = || cancel.is_cancelled() || shutdown.is_cancelled();
                let response =
                    run_request(kernel, cancel_check_interval, request_id, limit, &interrupted);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                if respond.send(response).is_err() {
                    debug!(request_id, "caller dropped pending task before response");
                }
            }
            debug!("task worker exiting");
        })?;

    Ok((request_tx, handle))
}

fn run_request(
    kernel: Kernel,
    cancel_check_interval: u64,
    request_id: RequestId,
    limit: PrimeLimit,
    interrupted: &dyn Fn() -> bool,
) -> Response {
    if interrupted() {
        info!(request_id, "request cancelled before it started");
        return Ok(TaskOutcome::Cancelled { request_id });
    }

    debug!(request_id, %limit, "running request");
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        kernel(limit, cancel_check_interval, interrupted)
    }));

    match result {
        Ok(Some(report)) => {
            info!(
                request_id,
                match_count = report.match_count,
                last_match = report.last_match,
                elapsed_millis = report.elapsed_millis,
                "request completed"
            );
            Ok(TaskOutcome::Completed { request_id, report })
        }
        Ok(None) => {
            info!(request_id, "request cancelled");
            Ok(TaskOutcome::Cancelled { request_id })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(request_id, %message, "request faulted");
            Err(TaskError::Faulted {
                request_id,
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
