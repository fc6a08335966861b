use crate::model::{Operation, RequestMetadata};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc},
    thread::JoinHandle,
    time::{Duration, Instant},
};

type EngineResponse<O> = InvocationEngineResponse<
    <<O as Operation>::Request as RequestMetadata>::Metadata,
    Result<<O as Operation>::Response, <O as Operation>::Error>,
>;

/// Represents the current state of the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum InvocationEngineState {
    /// The engine is idle and ready to accept new requests.
    Idle,
    /// The engine is currently running a request.
    Processing,
}

impl InvocationEngineState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationEngineState::Idle => "idle",
            InvocationEngineState::Processing => "processing",
        }
    }
}

struct InvocationEngineRequest<Req> {
    id: u64,
    request: Req,
}

/// Completed invocation together with its telemetry.
pub struct InvocationEngineResponse<Metadata, Res> {
    /// Identifier returned by [`InvocationEngine::schedule`].
    pub id: u64,
    /// Timestamp when the invocation started.
    pub start_time: Instant,
    /// Total time taken by the invocation.
    pub duration: Duration,
    /// Redacted metadata of the original request.
    pub request_metadata: Metadata,
    /// Outcome of the operation; failures do not stop the engine.
    pub response: Res,
}

/// Result type returned when polling for invocation results.
pub enum InvocationEngineResult<O: Operation>
where
    O::Request: RequestMetadata,
{
    /// A finished invocation, successful or not.
    Completed(EngineResponse<O>),
    /// No result available yet, with current engine state.
    Empty(InvocationEngineState),
    /// The worker thread is gone.
    Error(String),
}

/// Runs an [`Operation`] on a dedicated worker thread.
///
/// Requests are queued and run one at a time; callers poll for results
/// instead of blocking on the remote round-trip.
pub struct InvocationEngine<O: Operation + Send + 'static>
where
    O::Request: Send + RequestMetadata + 'static,
    O::Response: Send + 'static,
{
    state: Arc<Mutex<InvocationEngineState>>,
    req_tx: Option<mpsc::Sender<InvocationEngineRequest<O::Request>>>,
    rep_rx: Mutex<mpsc::Receiver<EngineResponse<O>>>,
    worker: Option<JoinHandle<()>>,
    id_counter: Mutex<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<O: Operation + Send + 'static> InvocationEngine<O>
where
    O::Request: Send + RequestMetadata + 'static,
    O::Response: Send + 'static,
{
    /// Creates the engine and moves `operation` onto its worker thread.
    pub fn new(operation: O) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<InvocationEngineRequest<O::Request>>();
        let (rep_tx, rep_rx) = mpsc::channel::<EngineResponse<O>>();
        let state = Arc::new(Mutex::new(InvocationEngineState::Idle));

        let worker = std::thread::spawn({
            let state = state.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Running invocation {} on {}", req.id, operation.name());

                    let request_metadata = req.request.metadata();

                    *lock(&state) = InvocationEngineState::Processing;
                    let start_time = Instant::now();

                    let response = operation.run(req.request);

                    log::debug!("Invocation {} completed", req.id);

                    let _ = rep_tx.send(InvocationEngineResponse {
                        id: req.id,
                        start_time,
                        duration: start_time.elapsed(),
                        request_metadata,
                        response,
                    });

                    *lock(&state) = InvocationEngineState::Idle;
                }
            }
        });

        Self {
            state,
            req_tx: Some(req_tx),
            rep_rx: Mutex::new(rep_rx),
            worker: Some(worker),
            id_counter: Mutex::new(0),
        }
    }

    /// Returns the current state of the engine.
    pub fn state(&self) -> InvocationEngineState {
        lock(&self.state).clone()
    }

    /// Retrieves a finished invocation without blocking.
    pub fn try_poll_response(&self) -> InvocationEngineResult<O> {
        match lock(&self.rep_rx).try_recv() {
            Ok(response) => InvocationEngineResult::Completed(response),
            Err(mpsc::TryRecvError::Empty) => InvocationEngineResult::Empty(self.state()),
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Response channel disconnected");
                InvocationEngineResult::Error("Response channel disconnected".to_string())
            }
        }
    }

    /// Waits up to `timeout` for the next finished invocation.
    pub fn poll_response_timeout(&self, timeout: Duration) -> InvocationEngineResult<O> {
        match lock(&self.rep_rx).recv_timeout(timeout) {
            Ok(response) => InvocationEngineResult::Completed(response),
            Err(mpsc::RecvTimeoutError::Timeout) => InvocationEngineResult::Empty(self.state()),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                log::error!("Response channel disconnected");
                InvocationEngineResult::Error("Response channel disconnected".to_string())
            }
        }
    }

    /// Queues a request and returns the id its response will carry.
    ///
    /// Returns `None` once the engine has been stopped.
    pub fn schedule(&self, request: O::Request) -> Option<u64> {
        let tx = self.req_tx.as_ref()?;
        let id = {
            let mut counter = lock(&self.id_counter);
            let id = *counter;
            *counter += 1;
            id
        };
        tx.send(InvocationEngineRequest { id, request }).ok()?;
        Some(id)
    }

    /// Closes the request queue and waits for queued requests to finish.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl<O: Operation + Send + 'static> Drop for InvocationEngine<O>
where
    O::Request: Send + RequestMetadata + 'static,
    O::Response: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
