use axum::{
    Json, Router,
    body::Bytes,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use image::{DynamicImage, ImageFormat};
use infernum_studio::{ClientError, HfInferenceClient, InferenceClient, StudioConfig};
use serde_json::{Value, json};
use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{OnceLock, mpsc},
    thread,
};

const TOKEN: &str = "hf_test";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

async fn generate(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorized(&headers) || body["inputs"] != "a paper boat" {
        return (StatusCode::BAD_REQUEST, Vec::new()).into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], png_bytes(3, 2)).into_response()
}

async fn detect(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    if !authorized(&headers) || content_type(&headers) != "image/png" || body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad request" })));
    }
    (
        StatusCode::OK,
        Json(json!([
            {"score": 0.97, "label": "cat", "box": {"xmin": 1, "ymin": 2, "xmax": 30, "ymax": 40}}
        ])),
    )
}

async fn transcribe(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    if !authorized(&headers) || content_type(&headers) != "audio/wav" || body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad request" })));
    }
    (StatusCode::OK, Json(json!({ "text": "hello" })))
}

// one loopback service per test binary, served from its own runtime thread
fn service() -> SocketAddr {
    static ADDR: OnceLock<SocketAddr> = OnceLock::new();
    *ADDR.get_or_init(|| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let app = Router::new()
                    .route("/models/generator", post(generate))
                    .route("/models/detector", post(detect))
                    .route("/models/whisper", post(transcribe))
                    .route(
                        "/models/locked",
                        post(|| async { (StatusCode::UNAUTHORIZED, "invalid token") }),
                    )
                    .route(
                        "/models/busy",
                        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
                    )
                    .route(
                        "/models/loading",
                        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model is loading") }),
                    )
                    .route(
                        "/models/broken",
                        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
                    )
                    .route(
                        "/models/garbage",
                        post(|| async { ([(header::CONTENT_TYPE, "image/png")], "not an image") }),
                    );
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        rx.recv().unwrap()
    })
}

fn client(model: &str) -> HfInferenceClient {
    let config = StudioConfig {
        endpoint: format!("http://{}/models", service()),
        ..Default::default()
    };
    HfInferenceClient::new(model, TOKEN.to_string(), &config).unwrap()
}

#[test]
fn generated_image_is_decoded() {
    let image = client("generator").generate_image("a paper boat").unwrap();
    assert_eq!((image.width(), image.height()), (3, 2));
}

#[test]
fn detection_sends_image_content_type() {
    let detections = client("detector").detect_objects(&png_bytes(4, 4)).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "cat");
    assert!((detections[0].confidence - 0.97).abs() < 1e-6);
    assert_eq!(detections[0].bbox.ymax, 40.0);
}

#[test]
fn transcription_sends_audio_content_type() {
    let text = client("whisper")
        .transcribe(b"RIFF\x24\x00\x00\x00WAVEfmt ")
        .unwrap();
    assert_eq!(text, "hello");
}

#[test]
fn rejected_token_is_unauthorized() {
    match client("locked").generate_image("a paper boat") {
        Err(ClientError::Unauthorized(message)) => assert_eq!(message, "invalid token"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[test]
fn throttled_request_is_rate_limited() {
    let result = client("busy").detect_objects(&png_bytes(2, 2));
    assert!(matches!(result, Err(ClientError::RateLimited)));
}

#[test]
fn loading_model_is_unavailable() {
    match client("loading").transcribe(b"RIFF") {
        Err(ClientError::Unavailable(message)) => assert_eq!(message, "model is loading"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[test]
fn other_failures_keep_status_and_body() {
    match client("broken").generate_image("a paper boat") {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn undecodable_image_is_a_decode_error() {
    let result = client("garbage").generate_image("a paper boat");
    assert!(matches!(result, Err(ClientError::Decode(_))));
}
