use crate::error::StudioError;
use std::{path::PathBuf, time::Duration};

/// Default base URL of the hosted inference API.
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";
/// Default object detection model.
pub const DEFAULT_DETECTION_MODEL: &str = "facebook/detr-resnet-50";
/// Default text-to-image model.
pub const DEFAULT_TEXT_TO_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-dev";
/// Default speech recognition model.
pub const DEFAULT_AUDIO_MODEL: &str = "openai/whisper-tiny";
/// File the generated image is written to, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "output_image.png";

/// Environment variable overriding [`DEFAULT_ENDPOINT`].
pub const ENDPOINT_ENV: &str = "HF_INFERENCE_ENDPOINT";
/// Environment variables holding the API credential, in lookup order.
pub const TOKEN_ENVS: [&str; 2] = ["HF_TOKEN", "HUGGING_FACE_HUB_TOKEN"];

/// Settings shared by every model variant of the studio.
#[derive(Clone, Debug, PartialEq)]
pub struct StudioConfig {
    /// Base URL; the model identifier is appended to it.
    pub endpoint: String,
    /// Upper bound for a single remote call.
    pub timeout: Duration,
    pub detection_model: String,
    pub text_to_image_model: String,
    pub audio_model: String,
    /// Where a generated image is saved.
    pub output_path: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(120),
            detection_model: DEFAULT_DETECTION_MODEL.to_string(),
            text_to_image_model: DEFAULT_TEXT_TO_IMAGE_MODEL.to_string(),
            audio_model: DEFAULT_AUDIO_MODEL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl StudioConfig {
    /// Default configuration with overrides taken from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        config
    }

    /// Full URL for the given model identifier.
    pub fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), model)
    }
}

/// Reads the API credential from the process environment.
pub fn token_from_env() -> Result<String, StudioError> {
    resolve_token(|key| std::env::var(key).ok())
}

fn resolve_token(lookup: impl Fn(&str) -> Option<String>) -> Result<String, StudioError> {
    TOKEN_ENVS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or_else(|| {
            StudioError::ClientInit(format!(
                "no API token found, set {} in the environment",
                TOKEN_ENVS[0]
            ))
        })
}
