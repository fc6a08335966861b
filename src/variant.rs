use crate::{
    client::{Detection, HfInferenceClient, InferenceClient},
    config::StudioConfig,
    error::StudioError,
    model::{Operation, RequestMetadata, Summary},
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

/// File extensions that mark an input as an image path rather than a prompt.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// What a model variant does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ObjectDetection,
    TextToImage,
    AudioToText,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::ObjectDetection,
        Capability::TextToImage,
        Capability::AudioToText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ObjectDetection => "object-detection",
            Capability::TextToImage => "text-to-image",
            Capability::AudioToText => "audio-to-text",
        }
    }

    /// Model used for this capability unless configured otherwise.
    pub fn default_model(&self, config: &StudioConfig) -> String {
        match self {
            Capability::ObjectDetection => config.detection_model.clone(),
            Capability::TextToImage => config.text_to_image_model.clone(),
            Capability::AudioToText => config.audio_model.clone(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object-detection" | "detection" | "detect" => Ok(Capability::ObjectDetection),
            "text-to-image" | "image" | "generate" => Ok(Capability::TextToImage),
            "audio-to-text" | "audio" | "transcribe" => Ok(Capability::AudioToText),
            other => Err(StudioError::InvalidInput(format!("unknown model kind: {other}"))),
        }
    }
}

/// Raw user input, not validated yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationRequest {
    /// A file chosen by the user.
    Path(PathBuf),
    /// Free text typed by the user.
    Text(String),
}

impl InvocationRequest {
    /// True when the input is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            InvocationRequest::Path(path) => path.as_os_str().to_string_lossy().trim().is_empty(),
            InvocationRequest::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<&str> for InvocationRequest {
    fn from(text: &str) -> Self {
        InvocationRequest::Text(text.to_string())
    }
}

impl From<String> for InvocationRequest {
    fn from(text: String) -> Self {
        InvocationRequest::Text(text)
    }
}

impl From<PathBuf> for InvocationRequest {
    fn from(path: PathBuf) -> Self {
        InvocationRequest::Path(path)
    }
}

/// Redacted view of an [`InvocationRequest`]: file name only, or prompt length only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedactedRequest {
    File { name: String },
    Text { chars: usize },
}

impl fmt::Display for RedactedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactedRequest::File { name } => write!(f, "file {name:?}"),
            RedactedRequest::Text { chars } => write!(f, "text ({chars} chars)"),
        }
    }
}

impl RequestMetadata for InvocationRequest {
    type Metadata = RedactedRequest;

    fn metadata(&self) -> Self::Metadata {
        match self {
            InvocationRequest::Path(path) => RedactedRequest::File {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            },
            InvocationRequest::Text(text) => RedactedRequest::Text {
                chars: text.chars().count(),
            },
        }
    }
}

/// An image produced by a text-to-image model.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub image: DynamicImage,
}

impl GeneratedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Writes the image, format chosen from the file extension.
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save(path)
    }
}

/// Output of one invocation, tagged by the kind of variant that produced it.
#[derive(Clone, Debug)]
pub enum InvocationResult {
    Detections(Vec<Detection>),
    Image(GeneratedImage),
    Transcription(String),
}

impl InvocationResult {
    pub fn capability(&self) -> Capability {
        match self {
            InvocationResult::Detections(_) => Capability::ObjectDetection,
            InvocationResult::Image(_) => Capability::TextToImage,
            InvocationResult::Transcription(_) => Capability::AudioToText,
        }
    }
}

impl Summary for InvocationResult {
    fn summary(&self) -> String {
        match self {
            InvocationResult::Detections(detections) => {
                format!("{} detection(s)", detections.len())
            }
            InvocationResult::Image(image) => {
                format!("image {}x{}", image.width(), image.height())
            }
            InvocationResult::Transcription(text) => {
                format!("transcription ({} chars)", text.chars().count())
            }
        }
    }
}

impl fmt::Display for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationResult::Detections(detections) if detections.is_empty() => {
                write!(f, "No objects were detected in the image.")
            }
            InvocationResult::Detections(detections) => {
                writeln!(f, "Detected {} object(s):", detections.len())?;
                for d in detections {
                    writeln!(
                        f,
                        "  {:<16} {:>5.1}%  [{:.0}, {:.0}, {:.0}, {:.0}]",
                        d.label,
                        d.confidence * 100.0,
                        d.bbox.xmin,
                        d.bbox.ymin,
                        d.bbox.xmax,
                        d.bbox.ymax
                    )?;
                }
                Ok(())
            }
            InvocationResult::Image(image) => {
                write!(f, "Generated image: {} x {} pixels", image.width(), image.height())
            }
            InvocationResult::Transcription(text) => write!(f, "Transcription: {text}"),
        }
    }
}

/// One remote model behind the uniform `run` operation.
///
/// The model identifier and the client handle are fixed at construction.
pub struct ModelVariant {
    name: String,
    capability: Capability,
    client: Arc<dyn InferenceClient>,
}

impl fmt::Debug for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelVariant")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

impl ModelVariant {
    /// Binds `name` to a hosted-API client, reading the credential from the environment.
    pub fn connect(
        name: impl Into<String>,
        capability: Capability,
        config: &StudioConfig,
    ) -> Result<Self, StudioError> {
        let name = name.into();
        let client = HfInferenceClient::from_env(&name, config)?;
        log::debug!("Connected {capability} model {name}");
        Ok(Self::with_client(name, capability, Arc::new(client)))
    }

    pub fn with_client(
        name: impl Into<String>,
        capability: Capability,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            client,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn info(&self) -> String {
        format!("Model: {}", self.name)
    }

    fn detect(&self, request: InvocationRequest) -> Result<InvocationResult, StudioError> {
        let image = read_input_file(request)?;
        let detections = self.client.detect_objects(&image)?;
        Ok(InvocationResult::Detections(detections))
    }

    fn generate(&self, request: InvocationRequest) -> Result<InvocationResult, StudioError> {
        let prompt = match request {
            InvocationRequest::Text(text) => text,
            InvocationRequest::Path(path) => {
                return Err(StudioError::InvalidInput(format!(
                    "expected a text description, got the file {}",
                    path.display()
                )));
            }
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::InvalidInput(
                "text description is empty".to_string(),
            ));
        }
        if has_image_extension(prompt) {
            return Err(StudioError::InvalidInput(
                "expected a text description, not an image file".to_string(),
            ));
        }

        let image = self.client.generate_image(prompt)?;
        Ok(InvocationResult::Image(GeneratedImage { image }))
    }

    fn transcribe(&self, request: InvocationRequest) -> Result<InvocationResult, StudioError> {
        let audio = read_input_file(request)?;
        let text = self.client.transcribe(&audio)?;
        Ok(InvocationResult::Transcription(text))
    }
}

impl Operation for ModelVariant {
    type Request = InvocationRequest;
    type Response = InvocationResult;
    type Error = StudioError;

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, request: InvocationRequest) -> Result<InvocationResult, StudioError> {
        match self.capability {
            Capability::ObjectDetection => self.detect(request),
            Capability::TextToImage => self.generate(request),
            Capability::AudioToText => self.transcribe(request),
        }
    }
}

/// True if the text ends in one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn has_image_extension(text: &str) -> bool {
    let text = text.trim().to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| text.ends_with(&format!(".{ext}")))
}

fn read_input_file(request: InvocationRequest) -> Result<Vec<u8>, StudioError> {
    if request.is_blank() {
        return Err(StudioError::InvalidInput("no file selected".to_string()));
    }
    let path = match request {
        InvocationRequest::Path(path) => path,
        InvocationRequest::Text(text) => PathBuf::from(text.trim()),
    };
    if !path.exists() {
        return Err(StudioError::NotFound(path));
    }
    if !path.is_file() {
        return Err(StudioError::InvalidInput(format!(
            "{} is not a file",
            path.display()
        )));
    }

    std::fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StudioError::NotFound(path.clone()),
        _ => StudioError::InvalidInput(format!("cannot read {}: {e}", path.display())),
    })
}
