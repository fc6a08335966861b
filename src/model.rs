use std::fmt::Debug;

/// A `run`-shaped operation: one request in, one response or error out.
///
/// Model variants implement this trait, and so do the pipeline stages that
/// wrap them, which lets stages be stacked freely and handed to an
/// [`crate::InvocationEngine`].
pub trait Operation {
    /// The request type that the operation accepts.
    type Request;
    /// The response type that the operation returns on success.
    type Response;
    /// The error type that can be returned by the operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Identifier of the operation, used for logging.
    fn name(&self) -> &str;

    /// Runs the operation on the given request.
    fn run(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// Trait for extracting a lightweight, redacted view of a request.
///
/// The view is what gets logged and what the engine keeps for telemetry, so it
/// must not carry heavy data (file contents, images) or the raw user input.
pub trait RequestMetadata {
    /// The lightweight metadata type that represents the request.
    type Metadata: Debug + Send + 'static;

    /// Extracts the redacted metadata from the request.
    fn metadata(&self) -> Self::Metadata;
}

/// One-line description of a response, for logs.
pub trait Summary {
    fn summary(&self) -> String;
}
