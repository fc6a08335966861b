use std::path::PathBuf;

/// Errors raised by the model invocation layer.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// A local precondition failed: empty input or the wrong kind of input for the variant.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The referenced input file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The inference client could not be constructed.
    #[error("failed to initialize inference client: {0}")]
    ClientInit(String),
    /// The remote model could not be invoked or returned an unusable answer.
    #[error("model invocation failed: {0}")]
    Invocation(#[from] ClientError),
}

/// Failures reported by an [`crate::InferenceClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limited by the inference service")]
    RateLimited,
    #[error("model is unavailable: {0}")]
    Unavailable(String),
    #[error("inference service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<image::ImageError> for ClientError {
    fn from(err: image::ImageError) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
