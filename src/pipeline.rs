//! Cross-cutting stages wrapped around a model's `run`.
//!
//! [`build_pipeline`] composes them as `Validated<Logged<O>>`: input is checked
//! first, so a rejected request never reaches the recorder and never costs a
//! remote call. The logging stage only observes; it returns exactly what the
//! wrapped operation returned.

use crate::{
    error::StudioError,
    model::{Operation, RequestMetadata, Summary},
    variant::InvocationRequest,
};
use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

/// Observer notified around each logged invocation.
pub trait InvocationRecorder: Send + Sync {
    fn attempt(&self, operation: &str, request: &dyn Debug);
    fn success(&self, operation: &str, summary: &str, elapsed: Duration);
    fn failure(&self, operation: &str, error: &dyn std::error::Error, elapsed: Duration);
}

/// Recorder writing to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRecorder;

impl InvocationRecorder for LogRecorder {
    fn attempt(&self, operation: &str, request: &dyn Debug) {
        log::info!("Calling {operation} with {request:?}");
    }

    fn success(&self, operation: &str, summary: &str, elapsed: Duration) {
        log::info!("{operation} returned {summary} in {elapsed:?}");
    }

    fn failure(&self, operation: &str, error: &dyn std::error::Error, elapsed: Duration) {
        log::warn!("{operation} failed after {elapsed:?}: {error}");
    }
}

/// Rejects missing, empty and whitespace-only input before the wrapped operation runs.
pub struct Validated<O> {
    inner: O,
}

impl<O> Validated<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O> Operation for Validated<O>
where
    O: Operation<Request = InvocationRequest, Error = StudioError>,
{
    type Request = InvocationRequest;
    type Response = O::Response;
    type Error = StudioError;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, request: InvocationRequest) -> Result<O::Response, StudioError> {
        if request.is_blank() {
            log::debug!("Rejected blank input for {}", self.inner.name());
            return Err(StudioError::InvalidInput(
                "input data is missing or empty".to_string(),
            ));
        }
        self.inner.run(request)
    }
}

/// Reports each call and its outcome to an [`InvocationRecorder`].
pub struct Logged<O> {
    inner: O,
    recorder: Arc<dyn InvocationRecorder>,
}

impl<O> Logged<O> {
    pub fn new(inner: O, recorder: Arc<dyn InvocationRecorder>) -> Self {
        Self { inner, recorder }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O> Operation for Logged<O>
where
    O: Operation,
    O::Request: RequestMetadata,
    O::Response: Summary,
{
    type Request = O::Request;
    type Response = O::Response;
    type Error = O::Error;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, request: O::Request) -> Result<O::Response, O::Error> {
        let name = self.inner.name();
        self.recorder.attempt(name, &request.metadata());

        let start_time = Instant::now();
        let result = self.inner.run(request);
        match &result {
            Ok(response) => self
                .recorder
                .success(name, &response.summary(), start_time.elapsed()),
            Err(error) => self.recorder.failure(name, error, start_time.elapsed()),
        }
        result
    }
}

/// A model wrapped in validation and logging.
pub type Pipeline<O> = Validated<Logged<O>>;

/// Wraps `operation` so validation runs first and logging observes the rest.
pub fn build_pipeline<O>(operation: O, recorder: Arc<dyn InvocationRecorder>) -> Pipeline<O>
where
    O: Operation<Request = InvocationRequest, Error = StudioError>,
    O::Response: Summary,
{
    Validated::new(Logged::new(operation, recorder))
}

impl<O> Pipeline<O> {
    /// The model at the core of the pipeline.
    pub fn model(&self) -> &O {
        self.inner().inner()
    }
}
