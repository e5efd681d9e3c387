//! HTTP surface: upload route, offline mode and static pages.

use crate::config::Config;
use crate::detection::TumorDetector;
use crate::detection::preprocessing::decode_image;
use crate::error::ScanError;
use crate::models::{OfflineResult, UploadResponse};
use crate::offline::OfflineProcessor;
use crate::render;
use anyhow::Context;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("../static/index.html");
const OFFLINE_HTML: &str = include_str!("../static/offline.html");

/// Shared, read-only server state
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<TumorDetector>,
    pub offline: Arc<OfflineProcessor>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, detector: Arc<TumorDetector>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.upload_dir)
            .with_context(|| format!("creating upload directory {}", config.upload_dir.display()))?;
        let offline = OfflineProcessor::new(detector.clone(), &config.cache_dir)?;
        Ok(Self {
            detector,
            offline: Arc::new(offline),
            upload_dir: config.upload_dir.clone(),
        })
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let status = if self.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/offline_mode", get(offline_mode))
        .route("/upload", post(upload))
        .route("/offline", post(offline))
        .route("/cache", get(cached))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(config: Config, detector: Arc<TumorDetector>) -> anyhow::Result<()> {
    let state = AppState::new(&config, detector)?;
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn offline_mode() -> Html<&'static str> {
    Html(OFFLINE_HTML)
}

/// An uploaded file, as read from the multipart body
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, ScanError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!(%rejection, "upload is not multipart");
        ScanError::MissingFile
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "malformed multipart body");
        ScanError::MissingFile
    })? {
        if field.name() != Some("file") {
            continue;
        }
        // a plain form field named "file" is not a file part
        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(ScanError::MissingFile);
        };
        if filename.is_empty() {
            return Err(ScanError::EmptyFilename);
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ScanError::Processing(anyhow::anyhow!("reading upload: {e}")))?;
        return Ok(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ScanError::MissingFile)
}

/// Strip any directory components a client may have sent
fn basename(filename: &str) -> Result<String, ScanError> {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or(ScanError::EmptyFilename)
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ScanError> {
    let file = read_file_field(multipart).await?;
    let stored = state
        .upload_dir
        .join(format!("{}-{}", uuid::Uuid::new_v4(), basename(&file.filename)?));
    info!(file = %file.filename, bytes = file.bytes.len(), "upload received");

    let detector = state.detector.clone();
    let UploadedFile { filename, bytes } = file;
    let response = tokio::task::spawn_blocking(move || -> Result<UploadResponse, ScanError> {
        // only decodable images are kept
        let img = decode_image(&bytes)?;
        std::fs::write(&stored, &bytes)?;
        let outcome = detector.detect_and_segment(&img, &mut rand::rng())?;
        Ok(UploadResponse {
            image: render::image_to_base64(&outcome.image)?,
            has_tumor: outcome.has_tumor(),
            tumor_area: outcome.tumor_area(),
            filename,
        })
    })
    .await
    .map_err(|e| ScanError::Processing(e.into()))??;

    Ok(Json(response))
}

async fn offline(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OfflineResult>, ScanError> {
    let file = read_file_field(multipart).await?;
    let stored = state.upload_dir.join(basename(&file.filename)?);
    tokio::fs::write(&stored, &file.bytes).await?;

    let processor = state.offline.clone();
    let result = tokio::task::spawn_blocking(move || processor.process_image(&stored, &mut rand::rng()))
        .await
        .map_err(|e| ScanError::Processing(e.into()))??;

    Ok(Json(result))
}

async fn cached(State(state): State<AppState>) -> Result<Json<Vec<String>>, ScanError> {
    Ok(Json(state.offline.get_cached_results()?))
}
