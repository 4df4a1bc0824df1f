use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use super::range::{self, Span};
use crate::modules::media::service::MediaService;
use crate::state::AppState;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
/// Streaming chunk size for artifact responses.
const CHUNK_SIZE: usize = 1024 * 1024;
/// How often a waiting request re-checks the conversion queue.
const WAIT_POLL: Duration = Duration::from_millis(500);

/// Serve a transcoded audio artifact, converting it first if needed.
///
/// A request for an artifact that does not exist yet enqueues a conversion
/// and suspends until the file shows up. Dropping the connection abandons
/// the wait but not the conversion.
#[utoipa::path(
    get,
    path = "/audio/{id}",
    params(
        ("id" = String, Path, description = "Media ID")
    ),
    responses(
        (status = 200, description = "Full audio content"),
        (status = 206, description = "Partial audio content"),
        (status = 404, description = "Conversion did not produce a file"),
        (status = 408, description = "Gave up waiting for the conversion"),
        (status = 416, description = "Requested range not satisfiable"),
        (status = 422, description = "Source is permanently unavailable")
    ),
    tag = "Audio"
)]
pub async fn get_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    info!("Audio: {}", id);
    if MediaService::is_unavailable(&state, &id) {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }

    if !state.artifacts.exists(&id).await {
        state.queue.enqueue(&id);
        let waited = tokio::time::timeout(state.config.audio_wait_timeout(), async {
            while state.queue.contains(&id) {
                tokio::time::sleep(WAIT_POLL).await;
            }
        })
        .await;
        if waited.is_err() {
            info!("Gave up waiting for conversion of {}", id);
            return StatusCode::REQUEST_TIMEOUT.into_response();
        }
        if MediaService::is_unavailable(&state, &id) {
            return StatusCode::UNPROCESSABLE_ENTITY.into_response();
        }
        if !state.artifacts.exists(&id).await {
            // Conversion failed without a permanent verdict; the next
            // request starts over.
            return StatusCode::NOT_FOUND.into_response();
        }
    }

    serve_artifact(&state, &id, &headers).await
}

/// Report on an artifact without a body and without triggering a conversion.
#[utoipa::path(
    head,
    path = "/audio/{id}",
    params(
        ("id" = String, Path, description = "Media ID")
    ),
    responses(
        (status = 200, description = "Artifact is ready"),
        (status = 404, description = "Artifact is not cached"),
        (status = 422, description = "Source is permanently unavailable")
    ),
    tag = "Audio"
)]
pub async fn head_audio(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if MediaService::is_unavailable(&state, &id) {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    let meta = match tokio::fs::metadata(state.artifacts.path(&id)).await {
        Ok(meta) => meta,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                [
                    (header::ACCEPT_RANGES, "bytes"),
                    (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE),
                ],
            )
                .into_response();
        }
    };
    (
        [
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, meta.len().to_string()),
        ],
        Body::empty(),
    )
        .into_response()
}

async fn serve_artifact(state: &AppState, id: &str, headers: &HeaderMap) -> Response {
    let path = state.artifacts.path(id);
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) => {
            error!("Artifact for {} vanished before serving: {}", id, e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());
    let span = range::resolve(range_header, meta.len());

    if let Span::Unsatisfiable { .. } = span {
        let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
        insert_header(&mut response, header::CONTENT_TYPE, AUDIO_CONTENT_TYPE);
        if let Some(content_range) = span.content_range() {
            insert_header(&mut response, header::CONTENT_RANGE, &content_range);
        }
        return response;
    }

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let (status, start) = match span {
        Span::Partial { start, .. } => (StatusCode::PARTIAL_CONTENT, start),
        _ => (StatusCode::OK, 0),
    };
    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            error!("Failed to seek {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    // The stream ends quietly if the client hangs up mid-transfer.
    let reader = file.take(span.content_length());
    let stream = ReaderStream::with_capacity(reader, CHUNK_SIZE);

    let mut response = (status, Body::from_stream(stream)).into_response();
    insert_header(&mut response, header::ACCEPT_RANGES, "bytes");
    insert_header(&mut response, header::CONTENT_TYPE, AUDIO_CONTENT_TYPE);
    insert_header(
        &mut response,
        header::CONTENT_LENGTH,
        &span.content_length().to_string(),
    );
    if let Some(content_range) = span.content_range() {
        insert_header(&mut response, header::CONTENT_RANGE, &content_range);
    }
    response
}

fn insert_header(response: &mut Response, name: header::HeaderName, value: &str) {
    if let Ok(value) = value.parse() {
        response.headers_mut().insert(name, value);
    }
}
