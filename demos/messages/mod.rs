use infernum_studio::{Capability, Detection, RedactedRequest};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceRequest {
    pub model: Capability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InferenceOutput {
    Detections { objects: Vec<Detection> },
    Image { saved_to: PathBuf, width: u32, height: u32 },
    Transcription { text: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct InferenceResponse {
    pub id: u64,
    pub request: RedactedRequest,
    pub start_time: u128,
    pub duration: Duration,
    pub output: InferenceOutput,
}
