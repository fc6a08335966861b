//! Application state and the event handlers a front end binds to its widgets.
//!
//! Handlers never show anything themselves; they return a [`Notice`] for the
//! front end to render, and the result of a successful run stays readable
//! through [`StudioApp::last_result`].

use crate::{
    config::StudioConfig,
    error::StudioError,
    model::Operation,
    pipeline::{InvocationRecorder, LogRecorder, Pipeline, build_pipeline},
    variant::{Capability, InvocationRequest, InvocationResult, ModelVariant},
};
use std::{fmt, path::PathBuf, sync::Arc};

/// Shown by [`StudioApp::info`] while nothing is selected.
pub const NO_MODEL_INFO: &str = "Select a model to view its information";
/// Shown after the output area was cleared.
pub const OUTPUT_CLEARED: &str = "Output cleared. Ready for next operation.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message box's worth of feedback for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{level}] {}: {}", self.title, self.message)
    }
}

/// What the run action produced.
#[derive(Debug)]
pub enum RunOutcome {
    /// The model ran and its result is available through [`StudioApp::last_result`];
    /// `saved_to` is set when a generated image was written to disk.
    Completed {
        saved_to: Option<PathBuf>,
        notice: Notice,
    },
    /// Nothing was displayed; state is as it was before the run.
    Failed(Notice),
}

/// Input as last entered by the user. A browsed file wins over typed text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub file: Option<PathBuf>,
    pub text: String,
}

impl InputState {
    fn request(&self) -> InvocationRequest {
        match &self.file {
            Some(path) => InvocationRequest::Path(path.clone()),
            None => InvocationRequest::Text(self.text.clone()),
        }
    }
}

/// The studio: registered models, the active selection and the user's input.
pub struct StudioApp {
    models: Vec<Pipeline<ModelVariant>>,
    selected: Option<usize>,
    input: InputState,
    last_result: Option<InvocationResult>,
    output_path: PathBuf,
}

impl StudioApp {
    /// Connects the default object detection and text-to-image models.
    ///
    /// Fails when no API credential is available.
    pub fn connect(config: &StudioConfig) -> Result<Self, StudioError> {
        Self::connect_with(
            config,
            &[Capability::ObjectDetection, Capability::TextToImage],
        )
    }

    /// Connects the default model of each listed capability.
    pub fn connect_with(
        config: &StudioConfig,
        capabilities: &[Capability],
    ) -> Result<Self, StudioError> {
        let models = capabilities
            .iter()
            .map(|&capability| {
                ModelVariant::connect(capability.default_model(config), capability, config)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_models(
            models,
            Arc::new(LogRecorder),
            config.output_path.clone(),
        ))
    }

    pub fn with_models(
        models: Vec<ModelVariant>,
        recorder: Arc<dyn InvocationRecorder>,
        output_path: PathBuf,
    ) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| build_pipeline(model, recorder.clone()))
                .collect(),
            selected: None,
            input: InputState::default(),
            last_result: None,
            output_path,
        }
    }

    /// Capabilities that can be selected, in registration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.models.iter().map(|p| p.model().capability()).collect()
    }

    pub fn selected(&self) -> Option<&ModelVariant> {
        self.selected.map(|i| self.models[i].model())
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn last_result(&self) -> Option<&InvocationResult> {
        self.last_result.as_ref()
    }

    /// Makes the model of `capability` the active one.
    pub fn select_model(&mut self, capability: Capability) -> Notice {
        let Some(index) = self
            .models
            .iter()
            .position(|p| p.model().capability() == capability)
        else {
            return Notice::warning(
                "Model Unavailable",
                format!("No {capability} model is loaded."),
            );
        };

        self.selected = Some(index);
        let model = self.models[index].model();
        log::info!("Selected {} ({capability})", model.name());

        let first_step = match capability {
            Capability::ObjectDetection => "1. Browse and select an image file",
            Capability::TextToImage => "1. Type your text description",
            Capability::AudioToText => "1. Browse and select an audio file",
        };
        Notice::info(
            "Model Selected",
            format!(
                "{}\n\nNext steps:\n{first_step}\n2. Run the model",
                model.info()
            ),
        )
    }

    /// Records a file chosen by the user.
    pub fn browse(&mut self, path: impl Into<PathBuf>) -> Notice {
        let path = path.into();
        let message = format!("Selected file: {}", path.display());
        self.input.file = Some(path);
        Notice::info("File Selected", message)
    }

    /// Records typed text; this drops any previously browsed file.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.input.file = None;
        self.input.text = text.into();
    }

    pub fn clear_input(&mut self) {
        self.input = InputState::default();
    }

    /// Information about the active model.
    pub fn info(&self) -> String {
        self.selected()
            .map(ModelVariant::info)
            .unwrap_or_else(|| NO_MODEL_INFO.to_string())
    }

    /// Drops the displayed result.
    pub fn clear_output(&mut self) -> &'static str {
        self.last_result = None;
        OUTPUT_CLEARED
    }

    /// Runs the active model on the current input.
    ///
    /// Errors are turned into notices; selection and input are left untouched
    /// so the user can correct the input and try again.
    pub fn run(&mut self) -> RunOutcome {
        let Some(index) = self.selected else {
            return RunOutcome::Failed(Notice::warning(
                "No Model Selected",
                "Please select a model first.",
            ));
        };
        let pipeline = &self.models[index];
        let capability = pipeline.model().capability();

        let result = match pipeline.run(self.input.request()) {
            Ok(result) => result,
            Err(err) => return RunOutcome::Failed(failure_notice(capability, &err)),
        };

        let mut saved_to = None;
        let notice = match &result {
            InvocationResult::Image(image) => match image.save(&self.output_path) {
                Ok(()) => {
                    saved_to = Some(self.output_path.clone());
                    Notice::info(
                        "Image Generated",
                        format!(
                            "Saved as: {}\nSize: {} x {} pixels",
                            self.output_path.display(),
                            image.width(),
                            image.height()
                        ),
                    )
                }
                Err(e) => {
                    log::warn!("Failed to save {}: {e}", self.output_path.display());
                    Notice::warning(
                        "Image Not Saved",
                        format!("The image was generated but could not be saved: {e}"),
                    )
                }
            },
            InvocationResult::Detections(detections) if detections.is_empty() => {
                Notice::info("No Objects", "No objects were detected in the image.")
            }
            InvocationResult::Detections(detections) => Notice::info(
                "Objects Detected",
                format!("Detected {} object(s) in the image.", detections.len()),
            ),
            InvocationResult::Transcription(_) => {
                Notice::info("Transcription Complete", "Audio transcribed successfully.")
            }
        };

        self.last_result = Some(result);
        RunOutcome::Completed {
            saved_to,
            notice,
        }
    }
}

fn failure_notice(capability: Capability, err: &StudioError) -> Notice {
    match err {
        StudioError::InvalidInput(reason) => {
            let hint = match capability {
                Capability::ObjectDetection => "Please browse and select an image file first.",
                Capability::TextToImage => {
                    "Please type a text description of the image to generate, not an image file."
                }
                Capability::AudioToText => "Please browse and select an audio file first.",
            };
            Notice::warning("Invalid Input", format!("{hint}\n\n({reason})"))
        }
        StudioError::NotFound(path) => Notice::error(
            "File Not Found",
            format!(
                "The file does not exist:\n{}\n\nPlease select a valid file.",
                path.display()
            ),
        ),
        StudioError::ClientInit(_) | StudioError::Invocation(_) => {
            let action = match capability {
                Capability::ObjectDetection => "process image",
                Capability::TextToImage => "generate image",
                Capability::AudioToText => "transcribe audio",
            };
            Notice::error("Error", format!("Failed to {action}:\n\n{err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::testing::SpyRecorder,
        variant::testing::{StubClient, cat},
    };

    struct Fixture {
        app: StudioApp,
        detector: Arc<StubClient>,
        generator: Arc<StubClient>,
        _dir: tempfile::TempDir,
    }

    fn fixture(detector: StubClient, generator: StubClient) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let detector = Arc::new(detector);
        let generator = Arc::new(generator);
        let app = StudioApp::with_models(
            vec![
                ModelVariant::with_client(
                    "facebook/detr-resnet-50",
                    Capability::ObjectDetection,
                    detector.clone(),
                ),
                ModelVariant::with_client(
                    "black-forest-labs/FLUX.1-dev",
                    Capability::TextToImage,
                    generator.clone(),
                ),
            ],
            Arc::new(SpyRecorder::default()),
            dir.path().join("output_image.png"),
        );
        Fixture {
            app,
            detector,
            generator,
            _dir: dir,
        }
    }

    #[test]
    fn run_without_selection_warns() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        f.app.set_text("a cat");
        match f.app.run() {
            RunOutcome::Failed(notice) => {
                assert_eq!(notice.level, NoticeLevel::Warning);
                assert_eq!(notice.title, "No Model Selected");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(f.generator.calls(), 0);
    }

    #[test]
    fn info_follows_selection_and_is_idempotent() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        assert_eq!(f.app.info(), NO_MODEL_INFO);

        f.app.select_model(Capability::ObjectDetection);
        let first = f.app.info();
        assert_eq!(first, "Model: facebook/detr-resnet-50");
        assert_eq!(f.app.info(), first);
    }

    #[test]
    fn selecting_unknown_capability_keeps_selection() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        f.app.select_model(Capability::TextToImage);
        let notice = f.app.select_model(Capability::AudioToText);
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(
            f.app.selected().map(|m| m.capability()),
            Some(Capability::TextToImage)
        );
    }

    #[test]
    fn generated_image_is_saved_and_kept() {
        let mut f = fixture(
            StubClient::default(),
            StubClient {
                image_size: (16, 12),
                ..Default::default()
            },
        );
        f.app.select_model(Capability::TextToImage);
        f.app.set_text("a cat playing guitar");

        match f.app.run() {
            RunOutcome::Completed {
                saved_to, notice, ..
            } => {
                let saved = saved_to.expect("image should be saved");
                assert!(saved.exists());
                assert!(notice.message.contains("16 x 12"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(f.app.last_result().is_some());
        assert_eq!(f.app.clear_output(), OUTPUT_CLEARED);
        assert!(f.app.last_result().is_none());
    }

    #[test]
    fn invalid_input_gives_variant_specific_hint() {
        let mut f = fixture(StubClient::default(), StubClient::default());

        f.app.select_model(Capability::TextToImage);
        f.app.set_text("holiday.JPG");
        let RunOutcome::Failed(text_notice) = f.app.run() else {
            panic!("expected failure");
        };

        f.app.select_model(Capability::ObjectDetection);
        f.app.clear_input();
        let RunOutcome::Failed(image_notice) = f.app.run() else {
            panic!("expected failure");
        };

        assert_eq!(text_notice.title, "Invalid Input");
        assert_eq!(image_notice.title, "Invalid Input");
        assert!(text_notice.message.contains("text description"));
        assert!(image_notice.message.contains("image file"));
        assert_ne!(text_notice.message, image_notice.message);
        assert_eq!(f.detector.calls() + f.generator.calls(), 0);
    }

    #[test]
    fn failed_run_leaves_state_untouched() {
        let mut f = fixture(
            StubClient {
                detections: vec![cat()],
                ..Default::default()
            },
            StubClient {
                fail: true,
                ..Default::default()
            },
        );
        let image = tempfile::NamedTempFile::new().unwrap();

        f.app.select_model(Capability::ObjectDetection);
        f.app.browse(image.path());
        assert!(matches!(f.app.run(), RunOutcome::Completed { .. }));

        f.app.select_model(Capability::TextToImage);
        f.app.set_text("valid text");
        let before = f.app.input().clone();
        let RunOutcome::Failed(notice) = f.app.run() else {
            panic!("expected failure");
        };
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.starts_with("Failed to generate image"));
        assert_eq!(f.app.input(), &before);
        assert!(matches!(
            f.app.last_result(),
            Some(InvocationResult::Detections(_))
        ));

        // retry goes through again
        assert!(matches!(f.app.run(), RunOutcome::Failed(_)));
        assert_eq!(f.generator.calls(), 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        f.app.select_model(Capability::ObjectDetection);
        f.app.browse("does/not/exist.png");
        let RunOutcome::Failed(notice) = f.app.run() else {
            panic!("expected failure");
        };
        assert_eq!(notice.title, "File Not Found");
        assert_eq!(f.detector.calls(), 0);
    }

    #[test]
    fn typed_text_replaces_browsed_file() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        f.app.browse("photo.png");
        f.app.set_text("a prompt");
        assert_eq!(f.app.input().file, None);
        assert_eq!(f.app.input().request(), InvocationRequest::from("a prompt"));
    }

    #[test]
    fn completed_run_is_read_back_from_last_result() {
        let mut f = fixture(
            StubClient::default(),
            StubClient {
                image_size: (20, 10),
                ..Default::default()
            },
        );
        f.app.select_model(Capability::TextToImage);
        f.app.set_text("a paper boat");
        assert!(matches!(f.app.run(), RunOutcome::Completed { .. }));

        match f.app.last_result() {
            Some(InvocationResult::Image(image)) => {
                assert_eq!((image.width(), image.height()), (20, 10));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_detection_is_a_success() {
        let mut f = fixture(StubClient::default(), StubClient::default());
        let image = tempfile::NamedTempFile::new().unwrap();
        f.app.select_model(Capability::ObjectDetection);
        f.app.browse(image.path());
        match f.app.run() {
            RunOutcome::Completed { notice, .. } => assert_eq!(notice.title, "No Objects"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
