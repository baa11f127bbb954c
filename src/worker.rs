// WHY: long scans run on a dedicated thread per operation kind so the caller is never blocked
// Each request gets its own event channel; a worker runs at most one request at a time

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// Identifier assigned to each submitted request, unique per worker
pub type RequestId = u64;

/// The long-running operations exposed through workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Tokenize,
    Match,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenize => write!(f, "tokenize"),
            Self::Match => write!(f, "match"),
        }
    }
}

/// Event delivered to the caller for one request
///
/// Zero or more `Progress` events with non-decreasing percentages are followed by
/// exactly one terminal `Result` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkerEvent<T> {
    Progress { percent: u8 },
    Result { value: T },
    Error { message: String },
}

impl<T> WorkerEvent<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Transform the result payload, leaving progress and error events untouched
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> WorkerEvent<U> {
        match self {
            Self::Progress { percent } => WorkerEvent::Progress { percent },
            Self::Result { value } => WorkerEvent::Result { value: f(value) },
            Self::Error { message } => WorkerEvent::Error { message },
        }
    }
}

/// Lifecycle of a worker: `Idle -> Running(id) -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running(RequestId),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{kind} worker is busy with request {running}")]
    Busy { kind: OperationKind, running: RequestId },

    #[error("failed to start {kind} worker thread: {source}")]
    Spawn {
        kind: OperationKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} worker is no longer accepting requests")]
    Unavailable { kind: OperationKind },

    #[error("{kind} request {id} failed: {message}")]
    Failed {
        kind: OperationKind,
        id: RequestId,
        message: String,
    },

    #[error("{kind} request {id} ended without a result")]
    Disconnected { kind: OperationKind, id: RequestId },
}

/// Operation executed on the worker thread; the callback receives progress percentages
pub type Operation<I, O> = dyn Fn(I, &mut dyn FnMut(u8)) -> O + Send + Sync;

struct Job<I, O> {
    id: RequestId,
    input: I,
    events: mpsc::UnboundedSender<WorkerEvent<O>>,
}

/// One lazily started worker thread serving a single operation kind
pub struct OperationWorker<I, O> {
    kind: OperationKind,
    operation: Arc<Operation<I, O>>,
    jobs: Mutex<Option<std_mpsc::Sender<Job<I, O>>>>,
    state: Arc<Mutex<WorkerState>>,
    next_id: AtomicU64,
}

impl<I, O> OperationWorker<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(kind: OperationKind, operation: F) -> Self
    where
        F: Fn(I, &mut dyn FnMut(u8)) -> O + Send + Sync + 'static,
    {
        Self {
            kind,
            operation: Arc::new(operation),
            jobs: Mutex::new(None),
            state: Arc::new(Mutex::new(WorkerState::Idle)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> WorkerState {
        *lock(&self.state)
    }

    /// Start a request, returning a handle to its event stream
    ///
    /// Fails with `WorkerError::Busy` while a previous request is still running;
    /// the running request is left untouched.
    pub fn submit(&self, input: I) -> Result<RequestHandle<O>, WorkerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut state = lock(&self.state);
            if let WorkerState::Running(running) = *state {
                warn!(kind = %self.kind, running, rejected = id, "Worker busy, rejecting request");
                return Err(WorkerError::Busy {
                    kind: self.kind,
                    running,
                });
            }
            *state = WorkerState::Running(id);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let job = Job {
            id,
            input,
            events: events_tx,
        };

        if let Err(e) = self.dispatch(job) {
            *lock(&self.state) = WorkerState::Idle;
            return Err(e);
        }

        debug!(kind = %self.kind, id, "Request submitted");
        Ok(RequestHandle {
            id,
            kind: self.kind,
            events: events_rx,
        })
    }

    fn dispatch(&self, job: Job<I, O>) -> Result<(), WorkerError> {
        let mut jobs = lock(&self.jobs);

        if jobs.is_none() {
            *jobs = Some(self.spawn_thread()?);
        }

        let sender = jobs.as_ref().ok_or(WorkerError::Unavailable { kind: self.kind })?;
        if sender.send(job).is_err() {
            // Thread is gone; the next submit starts a fresh one
            *jobs = None;
            error!(kind = %self.kind, "Worker thread exited unexpectedly");
            return Err(WorkerError::Unavailable { kind: self.kind });
        }
        Ok(())
    }

    fn spawn_thread(&self) -> Result<std_mpsc::Sender<Job<I, O>>, WorkerError> {
        let (jobs_tx, jobs_rx) = std_mpsc::channel();
        let kind = self.kind;
        let operation = Arc::clone(&self.operation);
        let state = Arc::clone(&self.state);

        thread::Builder::new()
            .name(format!("quotefinder-{kind}"))
            .spawn(move || run_worker(kind, operation, jobs_rx, state))
            .map_err(|source| WorkerError::Spawn { kind, source })?;

        info!(%kind, "Started worker thread");
        Ok(jobs_tx)
    }
}

fn run_worker<I, O>(
    kind: OperationKind,
    operation: Arc<Operation<I, O>>,
    jobs: std_mpsc::Receiver<Job<I, O>>,
    state: Arc<Mutex<WorkerState>>,
) {
    while let Ok(Job { id, input, events }) = jobs.recv() {
        debug!(%kind, id, "Worker started request");
        let start_time = std::time::Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let progress_events = events.clone();
            let mut on_progress = move |percent: u8| {
                // Fire-and-forget: a dropped handle just stops listening
                let _ = progress_events.send(WorkerEvent::Progress { percent });
            };
            (*operation)(input, &mut on_progress)
        }));

        // Back to idle before the terminal event so the receiver may submit again immediately
        {
            let mut current = lock(&state);
            if *current == WorkerState::Running(id) {
                *current = WorkerState::Idle;
            }
        }

        let event = match outcome {
            Ok(value) => {
                debug!(%kind, id, elapsed_ms = start_time.elapsed().as_millis() as u64, "Worker finished request");
                WorkerEvent::Result { value }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%kind, id, %message, "Worker request panicked");
                WorkerEvent::Error { message }
            }
        };

        if events.send(event).is_err() {
            debug!(%kind, id, "Request handle dropped before result was delivered");
        }
    }

    debug!(%kind, "Worker thread shutting down");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caller side of a single request
#[derive(Debug)]
pub struct RequestHandle<O> {
    id: RequestId,
    kind: OperationKind,
    events: mpsc::UnboundedReceiver<WorkerEvent<O>>,
}

impl<O> RequestHandle<O> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Next event, or `None` once the terminal event has been taken
    pub async fn next_event(&mut self) -> Option<WorkerEvent<O>> {
        self.events.recv().await
    }

    /// Events as a `Stream`
    pub fn into_stream(self) -> UnboundedReceiverStream<WorkerEvent<O>> {
        UnboundedReceiverStream::new(self.events)
    }

    /// Wait for the result, forwarding progress percentages to `on_progress`
    pub async fn result_with_progress<F: FnMut(u8)>(
        mut self,
        mut on_progress: F,
    ) -> Result<O, WorkerError> {
        while let Some(event) = self.events.recv().await {
            match event {
                WorkerEvent::Progress { percent } => on_progress(percent),
                WorkerEvent::Result { value } => return Ok(value),
                WorkerEvent::Error { message } => {
                    return Err(WorkerError::Failed {
                        kind: self.kind,
                        id: self.id,
                        message,
                    })
                }
            }
        }

        Err(WorkerError::Disconnected {
            kind: self.kind,
            id: self.id,
        })
    }

    /// Wait for the result, ignoring progress
    pub async fn result(self) -> Result<O, WorkerError> {
        self.result_with_progress(|_| {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    fn doubling_worker() -> OperationWorker<u32, u32> {
        OperationWorker::new(OperationKind::Match, |input: u32, progress: &mut dyn FnMut(u8)| {
            progress(0);
            progress(50);
            progress(100);
            input * 2
        })
    }

    #[tokio::test]
    async fn test_progress_then_result() {
        let worker = doubling_worker();
        let handle = worker.submit(21).expect("Submit should succeed");

        let events: Vec<WorkerEvent<u32>> = handle.into_stream().collect().await;
        assert_eq!(
            events,
            vec![
                WorkerEvent::Progress { percent: 0 },
                WorkerEvent::Progress { percent: 50 },
                WorkerEvent::Progress { percent: 100 },
                WorkerEvent::Result { value: 42 },
            ]
        );
    }

    #[tokio::test]
    async fn test_worker_is_reused_across_requests() {
        let worker = OperationWorker::new(OperationKind::Tokenize, |_: (), _: &mut dyn FnMut(u8)| {
            thread::current().name().map(str::to_string)
        });

        let first = worker.submit(()).unwrap().result().await.unwrap();
        let second = worker.submit(()).unwrap().result().await.unwrap();
        assert_eq!(first.as_deref(), Some("quotefinder-tokenize"));
        assert_eq!(first, second);
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let worker = doubling_worker();
        let first = worker.submit(1).unwrap();
        let first_id = first.id();
        first.result().await.unwrap();
        let second = worker.submit(2).unwrap();
        assert!(second.id() > first_id);
        assert_eq!(second.kind(), OperationKind::Match);
    }

    #[tokio::test]
    async fn test_busy_worker_rejects_second_request() {
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let worker = OperationWorker::new(OperationKind::Match, move |input: u32, progress: &mut dyn FnMut(u8)| {
            progress(10);
            let _ = lock(&release_rx).recv_timeout(Duration::from_secs(10));
            input + 1
        });

        let mut first = worker.submit(1).expect("First submit should succeed");
        assert_eq!(first.next_event().await, Some(WorkerEvent::Progress { percent: 10 }));
        assert_eq!(worker.state(), WorkerState::Running(first.id()));

        match worker.submit(2) {
            Err(WorkerError::Busy { kind, running }) => {
                assert_eq!(kind, OperationKind::Match);
                assert_eq!(running, first.id());
            }
            other => panic!("Expected busy error, got {other:?}"),
        }

        release_tx.send(()).unwrap();
        assert_eq!(first.result().await.unwrap(), 2);

        // Idle again once the result has arrived
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.submit(5).unwrap().result().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_panic_becomes_error_event() {
        let worker = OperationWorker::new(OperationKind::Tokenize, |input: u32, _: &mut dyn FnMut(u8)| {
            if input == 0 {
                panic!("cannot process zero");
            }
            input
        });

        let mut handle = worker.submit(0).unwrap();
        assert_eq!(
            handle.next_event().await,
            Some(WorkerEvent::Error {
                message: "cannot process zero".to_string()
            })
        );
        assert_eq!(handle.next_event().await, None);

        // The same thread keeps serving requests after a panic
        assert_eq!(worker.submit(7).unwrap().result().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_failed_result() {
        let worker = OperationWorker::new(OperationKind::Match, |_: (), _: &mut dyn FnMut(u8)| -> u32 {
            panic!("boom");
        });

        let err = worker.submit(()).unwrap().result().await.unwrap_err();
        assert!(matches!(err, WorkerError::Failed { ref message, .. } if message == "boom"));
        assert!(err.to_string().contains("match request"));
    }

    #[tokio::test]
    async fn test_result_with_progress_collects_percentages() {
        let worker = doubling_worker();
        let mut seen = Vec::new();
        let value = worker
            .submit(4)
            .unwrap()
            .result_with_progress(|p| seen.push(p))
            .await
            .unwrap();
        assert_eq!(value, 8);
        assert_eq!(seen, vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_block_worker() {
        let worker = doubling_worker();
        drop(worker.submit(1).unwrap());

        // The worker finishes the abandoned request and returns to idle
        let mut attempts = 0;
        let handle = loop {
            match worker.submit(3) {
                Ok(handle) => break handle,
                Err(WorkerError::Busy { .. }) if attempts < 100 => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Err(e) => panic!("Unexpected error: {e}"),
            }
        };
        assert_eq!(handle.result().await.unwrap(), 6);
    }

    #[test]
    fn test_event_wire_format() {
        let progress: WorkerEvent<Vec<u32>> = WorkerEvent::Progress { percent: 42 };
        assert_eq!(
            serde_json::to_string(&progress).unwrap(),
            r#"{"kind":"progress","percent":42}"#
        );

        let result = WorkerEvent::Result { value: vec![1, 2] };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"kind":"result","value":[1,2]}"#
        );

        let error: WorkerEvent<()> = WorkerEvent::Error { message: "oops".into() };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"kind":"error","message":"oops"}"#
        );
        assert!(error.is_terminal());
        assert!(!progress.is_terminal());
    }

    #[test]
    fn test_event_map() {
        let event = WorkerEvent::Result { value: 3 }.map(|v| v * 10);
        assert_eq!(event, WorkerEvent::Result { value: 30 });

        let progress: WorkerEvent<u32> = WorkerEvent::Progress { percent: 5 };
        assert_eq!(progress.map(|v| v + 1), WorkerEvent::Progress { percent: 5 });
    }
}
