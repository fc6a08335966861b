use crate::{
    config::{StudioConfig, token_from_env},
    error::{ClientError, StudioError},
};
use image::DynamicImage;
use reqwest::{
    StatusCode,
    blocking::{Client, Response},
    header::CONTENT_TYPE,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Pixel-space bounding box of a detected object.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// One object found by a detection model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Detection {
    pub label: String,
    #[serde(rename = "score")]
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// The remote calls a model variant depends on.
///
/// A client is bound to a single model when it is constructed.
pub trait InferenceClient: Send + Sync {
    /// Runs object detection on an encoded image.
    fn detect_objects(&self, image: &[u8]) -> Result<Vec<Detection>, ClientError>;

    /// Generates an image from a text prompt.
    fn generate_image(&self, prompt: &str) -> Result<DynamicImage, ClientError>;

    /// Transcribes an encoded audio file.
    fn transcribe(&self, audio: &[u8]) -> Result<String, ClientError>;
}

#[derive(Deserialize)]
struct TranscriptionPayload {
    text: String,
}

/// Blocking client for the hosted inference API.
pub struct HfInferenceClient {
    http: Client,
    url: String,
    token: String,
}

impl HfInferenceClient {
    /// Creates a client for `model`, reading the API token from the environment.
    pub fn from_env(model: &str, config: &StudioConfig) -> Result<Self, StudioError> {
        Self::new(model, token_from_env()?, config)
    }

    pub fn new(model: &str, token: String, config: &StudioConfig) -> Result<Self, StudioError> {
        if model.trim().is_empty() {
            return Err(StudioError::ClientInit("model identifier is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StudioError::ClientInit(e.to_string()))?;

        Ok(Self {
            http,
            url: config.model_url(model),
            token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post_bytes(&self, body: &[u8], content_type: &str) -> Result<Response, ClientError> {
        log::debug!("POST {} ({} bytes, {})", self.url, body.len(), content_type);
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()?;
        check_status(response)
    }
}

impl InferenceClient for HfInferenceClient {
    fn detect_objects(&self, encoded: &[u8]) -> Result<Vec<Detection>, ClientError> {
        let content_type = image::guess_format(encoded)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        let body = self.post_bytes(encoded, content_type)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn generate_image(&self, prompt: &str) -> Result<DynamicImage, ClientError> {
        log::debug!("POST {} (text-to-image)", self.url);
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": prompt }))
            .send()?;
        let bytes = check_status(response)?.bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }

    fn transcribe(&self, audio: &[u8]) -> Result<String, ClientError> {
        let body = self.post_bytes(audio, audio_mime_type(audio))?.text()?;
        let payload: TranscriptionPayload = serde_json::from_str(&body)?;
        Ok(payload.text)
    }
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err(status_error(status, message))
}

fn status_error(status: StatusCode, message: String) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        StatusCode::SERVICE_UNAVAILABLE => ClientError::Unavailable(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

// sniffed from the container magic, the service rejects untyped audio
fn audio_mime_type(audio: &[u8]) -> &'static str {
    match audio {
        [b'R', b'I', b'F', b'F', ..] => "audio/wav",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB | 0xF3 | 0xF2, ..] => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
