use argh::FromArgs;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use infernum_studio::{
    Capability, InvocationEngine, InvocationEngineResult, InvocationEngineState,
    InvocationRequest, InvocationResult, LogRecorder, ModelVariant, Pipeline, StudioConfig,
    StudioError, build_pipeline,
};
use serde_json::json;
use std::{collections::HashMap, path::PathBuf, sync::Arc};

mod messages;

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Serves hosted model invocations through background engines.
struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// where generated images are written
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

type Engine = InvocationEngine<Pipeline<ModelVariant>>;

struct AppState {
    engines: HashMap<Capability, Engine>,
    config: StudioConfig,
}

async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models: Vec<_> = Capability::ALL
        .iter()
        .filter_map(|capability| {
            state.engines.get(capability).map(|engine| {
                json!({
                    "model": capability,
                    "name": capability.default_model(&state.config),
                    "status": engine.state().as_str(),
                })
            })
        })
        .collect();
    Json(json!({ "models": models }))
}

async fn post_inference(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<messages::InferenceRequest>,
) -> impl IntoResponse {
    let Some(engine) = state.engines.get(&payload.model) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{} is not loaded", payload.model) })),
        );
    };

    if engine.state() != InvocationEngineState::Idle {
        log::debug!("Engine for {} is still processing", payload.model);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Engine is still processing" })),
        );
    }

    let request = match (payload.path, payload.prompt) {
        (Some(path), _) => InvocationRequest::Path(path),
        (None, prompt) => InvocationRequest::Text(prompt.unwrap_or_default()),
    };

    match engine.schedule(request) {
        Some(id) => {
            log::info!("Scheduled {} invocation {id}", payload.model);
            (StatusCode::OK, Json(json!({ "status": "scheduled", "id": id })))
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Engine is stopped" })),
        ),
    }
}

async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(model): Path<String>,
) -> impl IntoResponse {
    let engine = match model.parse::<Capability>() {
        Ok(capability) => state.engines.get(&capability),
        Err(_) => None,
    };
    let Some(engine) = engine else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{model} is not loaded") })),
        );
    };

    match engine.try_poll_response() {
        InvocationEngineResult::Completed(done) => match done.response {
            Ok(result) => {
                let output = match to_output(result, state.config.output_path.clone()).await {
                    Ok(output) => output,
                    Err(e) => {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "status": "error", "message": e })),
                        );
                    }
                };
                log::info!("Result {} received successfully", done.id);
                let response = messages::InferenceResponse {
                    id: done.id,
                    request: done.request_metadata,
                    start_time: done.start_time.elapsed().as_nanos(),
                    duration: done.duration,
                    output,
                };
                (
                    StatusCode::OK,
                    Json(json!({ "status": "success", "response": response })),
                )
            }
            Err(err) => {
                let status = match err {
                    StudioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    StudioError::NotFound(_) => StatusCode::NOT_FOUND,
                    StudioError::ClientInit(_) | StudioError::Invocation(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                (
                    status,
                    Json(json!({ "status": "error", "id": done.id, "message": err.to_string() })),
                )
            }
        },
        InvocationEngineResult::Empty(engine_state) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": engine_state.as_str(), "message": "No result available yet" })),
        ),
        InvocationEngineResult::Error(e) => {
            log::warn!("Engine for {model} failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e })),
            )
        }
    }
}

async fn to_output(
    result: InvocationResult,
    output_path: PathBuf,
) -> Result<messages::InferenceOutput, String> {
    Ok(match result {
        InvocationResult::Detections(objects) => messages::InferenceOutput::Detections { objects },
        InvocationResult::Image(image) => {
            // encoding and writing the file block, keep them off the runtime workers
            tokio::task::spawn_blocking(move || {
                image.save(&output_path)?;
                Ok::<_, image::ImageError>(messages::InferenceOutput::Image {
                    width: image.width(),
                    height: image.height(),
                    saved_to: output_path,
                })
            })
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?
        }
        InvocationResult::Transcription(text) => messages::InferenceOutput::Transcription { text },
    })
}

// blocking HTTP clients must be created and dropped outside the async runtime
fn start_engines(config: &StudioConfig) -> Result<HashMap<Capability, Engine>, StudioError> {
    let mut engines = HashMap::new();
    for capability in Capability::ALL {
        let model = ModelVariant::connect(capability.default_model(config), capability, config)?;
        log::info!("{}", model.info());
        let pipeline = build_pipeline(model, Arc::new(LogRecorder));
        engines.insert(capability, InvocationEngine::new(pipeline));
    }
    Ok(engines)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let mut config = StudioConfig::from_env();
    if let Some(output) = args.output {
        config.output_path = output;
    }

    let engines = tokio::task::spawn_blocking({
        let config = config.clone();
        move || start_engines(&config)
    })
    .await??;

    let state = Arc::new(AppState { engines, config });

    let app = Router::new()
        .route("/", get(|| async { "Welcome to Infernum Studio!" }))
        .route("/models", get(list_models))
        .route("/inference", post(post_inference))
        .route("/results/{model}", get(get_result))
        .with_state(state);

    log::info!("Starting the server");
    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
