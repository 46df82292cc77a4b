//! HTTP API server for the search front end.
//!
//! Provides search and keyframe resolution endpoints, and serves keyframe
//! images and source videos.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::FramefindError;
use crate::resolver::{FrameResolver, KeyframeRef};
use crate::search::{SearchEngine, SearchRequest};
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::error;

/// Shared application state.
struct AppState {
    engine: SearchEngine,
    videos_dir: PathBuf,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: &Settings) -> anyhow::Result<()> {
    let resolver = super::frame_resolver(settings)?;
    let engine = SearchEngine::from_settings(settings, resolver)?;

    let state = AppState {
        engine,
        videos_dir: settings.videos_dir(),
    };
    let app = router(Arc::new(state), settings.keyframes_dir());

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Framefind API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("Resolve", "GET  /resolve/{video_id}/{keyframe_index}");
    Output::kv("Keyframes", &format!("GET  /keyframes -> {}", settings.keyframes_dir().display()));
    Output::kv("Videos", &format!("GET  /videos/{{video_id}} -> {}", settings.videos_dir().display()));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>, keyframes_dir: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/resolve/{video_id}/{keyframe_index}", get(resolve))
        .route("/videos/{video_id}", get(video))
        .nest_service("/keyframes", ServeDir::new(keyframes_dir))
        .layer(cors)
        .with_state(state)
}

// === Response Types ===

#[derive(Serialize)]
struct ResolveResponse {
    video_id: String,
    /// Absent when the path segment was not an index.
    keyframe_index: Option<i64>,
    start_seconds: f64,
    frame_number: i64,
    fps: f64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    match state.engine.search(&req).await {
        Ok(results) => Json(results).into_response(),
        Err(FramefindError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, msg),
        Err(e) => {
            error!("Search failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn resolve(
    State(state): State<Arc<AppState>>,
    Path((video_id, keyframe_index)): Path<(String, String)>,
) -> Response {
    // A map miss reads from disk.
    let resolver = Arc::clone(state.engine.resolver());
    let body = tokio::task::spawn_blocking(move || resolve_response(&resolver, video_id, keyframe_index)).await;
    match body {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn resolve_response(resolver: &FrameResolver, video_id: String, keyframe_index: String) -> ResolveResponse {
    let key = KeyframeRef::parse(&keyframe_index);
    let frame = resolver.resolve_ref(&video_id, key);
    let fps = resolver.fps(&video_id);
    ResolveResponse {
        keyframe_index: key.index(),
        video_id,
        start_seconds: frame.timestamp_seconds,
        frame_number: frame.original_frame,
        fps,
    }
}

/// File name of a video, adding `.mp4` when the id carries no extension.
/// Ids that could leave the videos directory are rejected.
fn video_file_name(video_id: &str) -> Option<String> {
    if video_id.is_empty() || video_id.starts_with('.') || video_id.contains(['/', '\\']) {
        return None;
    }
    if video_id.ends_with(".mp4") {
        Some(video_id.to_string())
    } else {
        Some(format!("{}.mp4", video_id))
    }
}

async fn video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    request: Request,
) -> Response {
    let Some(file_name) = video_file_name(&video_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // ServeFile handles ranges and content types; its error type is Infallible.
    match ServeFile::new(state.videos_dir.join(file_name)).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
