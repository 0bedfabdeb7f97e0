use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::worker::{prime_kernel, spawn_task_worker, Kernel, Response, TaskRequest};
use crate::{PrimeLimit, RequestId, TaskError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Busy { in_flight: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Dispatched,
    Completed,
}

/// Request/response channel to a single background worker thread.
///
/// Requests run one at a time in dispatch order, so responses arrive in dispatch
/// order too. Dropping the channel lets the worker finish its queue and exit;
/// [`TaskChannel::shutdown`] cancels that queue instead.
pub struct TaskChannel {
    request_tx: mpsc::Sender<TaskRequest>,
    next_request_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    worker: thread::JoinHandle<()>,
}

impl TaskChannel {
    pub fn spawn(cancel_check_interval: u64) -> std::io::Result<Self> {
        Self::spawn_with_kernel(prime_kernel, cancel_check_interval)
    }

    pub(crate) fn spawn_with_kernel(
        kernel: Kernel,
        cancel_check_interval: u64,
    ) -> std::io::Result<Self> {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let (request_tx, worker) = spawn_task_worker(
            kernel,
            cancel_check_interval.max(1),
            shutdown.clone(),
            Arc::clone(&in_flight),
        )?;

        Ok(Self {
            request_tx,
            next_request_id: AtomicU64::new(1),
            in_flight,
            shutdown,
            worker,
        })
    }

    pub fn dispatch(&self, limit: PrimeLimit) -> Result<PendingTask, TaskError> {
        self.dispatch_with_token(limit, self.shutdown.child_token())
    }

    /// Dispatch with a caller-supplied token, e.g. a child of a wider shutdown token.
    /// The request also stops when the channel shuts down.
    pub fn dispatch_with_token(
        &self,
        limit: PrimeLimit,
        cancel: CancellationToken,
    ) -> Result<PendingTask, TaskError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (respond, response) = oneshot::channel();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let sent = self.request_tx.send(TaskRequest {
            request_id,
            limit,
            cancel: cancel.clone(),
            respond,
        });
        if sent.is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            warn!(request_id, "dispatch failed, worker is gone");
            return Err(TaskError::WorkerUnavailable);
        }

        info!(request_id, %limit, "request dispatched");
        Ok(PendingTask::new(request_id, limit, cancel, response))
    }

    /// Parses untrusted text and dispatches it. Malformed input never reaches the worker.
    pub fn dispatch_input(&self, input: &str) -> Result<PendingTask, TaskError> {
        let limit = input.parse::<PrimeLimit>().inspect_err(|err| {
            warn!(%err, "rejected background request");
        })?;
        self.dispatch(limit)
    }

    pub fn state(&self) -> ChannelState {
        match self.in_flight.load(Ordering::SeqCst) {
            0 => ChannelState::Idle,
            in_flight => ChannelState::Busy { in_flight },
        }
    }

    /// Cancels the running request and everything queued behind it, then joins
    /// the worker. Each outstanding [`PendingTask`] resolves to `Cancelled`.
    pub fn shutdown(self) -> Result<(), TaskError> {
        let TaskChannel {
            request_tx,
            shutdown,
            worker,
            ..
        } = self;

        info!("shutting down task worker");
        shutdown.cancel();
        drop(request_tx);
        worker.join().map_err(|_| TaskError::WorkerUnavailable)
    }
}

/// Caller-side handle for one dispatched request.
#[derive(Debug)]
pub struct PendingTask {
    request_id: RequestId,
    limit: PrimeLimit,
    cancel: CancellationToken,
    response: oneshot::Receiver<Response>,
    phase: TaskPhase,
}

impl PendingTask {
    fn new(
        request_id: RequestId,
        limit: PrimeLimit,
        cancel: CancellationToken,
        response: oneshot::Receiver<Response>,
    ) -> Self {
        Self {
            request_id,
            limit,
            cancel,
            response,
            phase: TaskPhase::Dispatched,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn limit(&self) -> PrimeLimit {
        self.limit
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Non-blocking poll for event loops. Yields the response exactly once.
    pub fn try_take(&mut self) -> Option<Response> {
        if self.phase == TaskPhase::Completed {
            return None;
        }

        match self.response.try_recv() {
            Ok(response) => {
                self.phase = TaskPhase::Completed;
                Some(response)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.phase = TaskPhase::Completed;
                Some(Err(TaskError::WorkerUnavailable))
            }
        }
    }

    pub async fn wait(self) -> Response {
        if self.phase == TaskPhase::Completed {
            return Err(TaskError::ResponseTaken {
                request_id: self.request_id,
            });
        }
        self.response
            .await
            .map_err(|_| TaskError::WorkerUnavailable)?
    }

    /// Blocking variant of [`PendingTask::wait`]. Must not be called from async code.
    pub fn blocking_wait(self) -> Response {
        if self.phase == TaskPhase::Completed {
            return Err(TaskError::ResponseTaken {
                request_id: self.request_id,
            });
        }
        self.response
            .blocking_recv()
            .map_err(|_| TaskError::WorkerUnavailable)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrimeReport, TaskOutcome, NO_MATCH};

    const HUGE: u64 = 1_000_000_000_000;

    fn limit(value: u64) -> PrimeLimit {
        PrimeLimit::new(value).unwrap()
    }

    fn completed(response: Response) -> PrimeReport {
        match response {
            Ok(TaskOutcome::Completed { report, .. }) => report,
            other => panic!("expected completed response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_returns_prime_report() {
        let channel = TaskChannel::spawn(4096).unwrap();

        let report = completed(channel.dispatch(limit(10)).unwrap().wait().await);
        assert_eq!(report.match_count, 4);
        assert_eq!(report.last_match, 7);

        let report = completed(channel.dispatch(limit(1)).unwrap().wait().await);
        assert_eq!(report.match_count, 0);
        assert_eq!(report.last_match, NO_MATCH);
    }

    #[tokio::test]
    async fn request_ids_increase_and_responses_follow_dispatch_order() {
        let channel = TaskChannel::spawn(4096).unwrap();

        let mut first = channel.dispatch(limit(10)).unwrap();
        let mut second = channel.dispatch(limit(100)).unwrap();
        let third = channel.dispatch(limit(1000)).unwrap();
        assert!(first.request_id() < second.request_id());
        assert!(second.request_id() < third.request_id());

        let third_id = third.request_id();
        let outcome = third.wait().await.unwrap();
        assert_eq!(outcome.request_id(), third_id);
        assert_eq!(outcome.report().unwrap().match_count, 168);

        assert_eq!(completed(first.try_take().unwrap()).match_count, 4);
        assert_eq!(completed(second.try_take().unwrap()).match_count, 25);
    }

    #[tokio::test]
    async fn cancel_resolves_to_cancelled_outcome() {
        let channel = TaskChannel::spawn(1).unwrap();

        let pending = channel.dispatch(limit(HUGE)).unwrap();
        let request_id = pending.request_id();
        pending.cancel();

        assert_eq!(
            pending.wait().await,
            Ok(TaskOutcome::Cancelled { request_id })
        );
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn state_tracks_in_flight_requests() {
        let channel = TaskChannel::spawn(1).unwrap();
        assert_eq!(channel.state(), ChannelState::Idle);

        let running = channel.dispatch(limit(HUGE)).unwrap();
        let queued = channel.dispatch(limit(HUGE)).unwrap();
        assert_eq!(channel.state(), ChannelState::Busy { in_flight: 2 });

        queued.cancel();
        running.cancel();
        assert!(matches!(running.wait().await, Ok(TaskOutcome::Cancelled { .. })));
        assert!(matches!(queued.wait().await, Ok(TaskOutcome::Cancelled { .. })));
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn linked_token_cancels_request() {
        let channel = TaskChannel::spawn(1).unwrap();
        let parent = CancellationToken::new();

        let pending = channel
            .dispatch_with_token(limit(HUGE), parent.child_token())
            .unwrap();
        parent.cancel();

        assert!(matches!(pending.wait().await, Ok(TaskOutcome::Cancelled { .. })));
    }

    #[tokio::test]
    async fn malformed_input_is_rejected_before_dispatch() {
        let channel = TaskChannel::spawn(4096).unwrap();

        for input in ["abc", "-5", "2.5", ""] {
            let err = channel.dispatch_input(input).unwrap_err();
            assert!(matches!(err, TaskError::InvalidRequest(_)), "{input}");
        }
        assert_eq!(channel.state(), ChannelState::Idle);

        let report = completed(channel.dispatch_input(" 10 ").unwrap().wait().await);
        assert_eq!(report.last_match, 7);
    }

    #[tokio::test]
    async fn panicking_computation_surfaces_as_fault() {
        fn exploding(_: PrimeLimit, _: u64, _: &dyn Fn() -> bool) -> Option<PrimeReport> {
            panic!("boom");
        }

        let channel = TaskChannel::spawn_with_kernel(exploding, 1).unwrap();

        for _ in 0..2 {
            let pending = channel.dispatch(limit(10)).unwrap();
            let request_id = pending.request_id();
            match pending.wait().await {
                Err(TaskError::Faulted {
                    request_id: faulted,
                    message,
                }) => {
                    assert_eq!(faulted, request_id);
                    assert_eq!(message, "boom");
                }
                other => panic!("expected fault, got {other:?}"),
            }
        }
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test]
    async fn response_is_taken_only_once() {
        let channel = TaskChannel::spawn(4096).unwrap();
        let mut pending = channel.dispatch(limit(10)).unwrap();
        assert_eq!(pending.phase(), TaskPhase::Dispatched);

        let response = loop {
            if let Some(response) = pending.try_take() {
                break response;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(completed(response).match_count, 4);
        assert_eq!(pending.phase(), TaskPhase::Completed);
        assert!(pending.try_take().is_none());

        let request_id = pending.request_id();
        assert_eq!(
            pending.wait().await,
            Err(TaskError::ResponseTaken { request_id })
        );
    }

    #[test]
    fn dropped_responder_reports_unavailable_worker() {
        let (respond, response) = oneshot::channel::<Response>();
        drop(respond);

        let mut pending = PendingTask::new(9, limit(10), CancellationToken::new(), response);
        assert_eq!(pending.try_take(), Some(Err(TaskError::WorkerUnavailable)));
    }

    #[test]
    fn shutdown_cancels_queued_work_instead_of_waiting_for_it() {
        let channel = TaskChannel::spawn(4096).unwrap();
        let first = channel.dispatch(limit(10)).unwrap();
        let queued = channel.dispatch(limit(HUGE)).unwrap();
        let queued_id = queued.request_id();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let _ = done_tx.send(channel.shutdown());
        });
        let joined = done_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("shutdown blocked on queued request");
        assert_eq!(joined, Ok(()));

        assert_eq!(
            queued.blocking_wait(),
            Ok(TaskOutcome::Cancelled {
                request_id: queued_id
            })
        );
        // The first request either finished before shutdown or was cancelled by it.
        match first.blocking_wait() {
            Ok(TaskOutcome::Completed { report, .. }) => assert_eq!(report.last_match, 7),
            Ok(TaskOutcome::Cancelled { .. }) => {}
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn shutdown_interrupts_running_request_with_caller_token() {
        let channel = TaskChannel::spawn(1).unwrap();
        let caller_token = CancellationToken::new();
        let running = channel
            .dispatch_with_token(limit(HUGE), caller_token.clone())
            .unwrap();

        channel.shutdown().unwrap();
        assert!(matches!(
            running.blocking_wait(),
            Ok(TaskOutcome::Cancelled { .. })
        ));
        assert!(!caller_token.is_cancelled());
    }

    #[tokio::test]
    async fn worker_path_matches_known_counts_past_check_interval() {
        let channel = TaskChannel::spawn(16).unwrap();
        let report = completed(channel.dispatch(limit(10_000)).unwrap().wait().await);
        assert_eq!((report.match_count, report.last_match), (1229, 9973));
    }

    #[test]
    fn report_uses_boundary_field_names() {
        let report = PrimeReport {
            match_count: 4,
            last_match: 7,
            elapsed_millis: 0.5,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matchCount"], 4);
        assert_eq!(json["lastMatch"], 7);
        assert_eq!(json["elapsedMillis"], 0.5);
    }
}
