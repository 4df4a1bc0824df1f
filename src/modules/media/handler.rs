use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use tracing::{error, info};

use super::service::MediaService;
use crate::common::response::ApiError;
use crate::infrastructure::upstream::ResolveError;
use crate::state::AppState;

/// Redirect to the direct upstream stream URL for a media id.
#[utoipa::path(
    get,
    path = "/video/{id}",
    params(
        ("id" = String, Path, description = "Media ID")
    ),
    responses(
        (status = 307, description = "Redirect to the upstream stream URL"),
        (status = 404, description = "Media could not be resolved"),
        (status = 422, description = "Media is permanently unavailable")
    ),
    tag = "Media"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Getting video: {}", id);
    match MediaService::resolve(&state, &id).await {
        Ok(media) => Redirect::temporary(&media.url).into_response(),
        Err(e @ ResolveError::Unavailable(_)) => {
            info!("Video {} unavailable: {}", id, e);
            ApiError("Media unavailable".to_string(), StatusCode::UNPROCESSABLE_ENTITY)
                .into_response()
        }
        Err(e) => {
            error!("Failed to resolve {}: {}", id, e);
            ApiError("Media not found".to_string(), StatusCode::NOT_FOUND).into_response()
        }
    }
}
