//! Run hosted AI models (object detection, text-to-image, speech-to-text)
//! behind one `run` operation, with validation and logging stages and an
//! optional background engine.

pub mod app;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod variant;

pub use app::{InputState, Notice, NoticeLevel, RunOutcome, StudioApp};
pub use client::{BoundingBox, Detection, HfInferenceClient, InferenceClient};
pub use config::StudioConfig;
pub use engine::{
    InvocationEngine, InvocationEngineResponse, InvocationEngineResult, InvocationEngineState,
};
pub use error::{ClientError, StudioError};
pub use model::{Operation, RequestMetadata, Summary};
pub use pipeline::{
    InvocationRecorder, LogRecorder, Logged, Pipeline, Validated, build_pipeline,
};
pub use variant::{
    Capability, GeneratedImage, InvocationRequest, InvocationResult, ModelVariant,
    RedactedRequest,
};
