use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info};

use super::dto::{AudioFileView, CacheView, ClearCacheQuery, ClearSelector, ClearedCounts};
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Clear cached state per domain and return what remains.
///
/// Every domain accepts `NONE`, `ALL`, or a specific key. With all
/// parameters absent this is a read-only view of the caches.
#[utoipa::path(
    get,
    path = "/cache",
    params(
        ("media_links" = Option<String>, Query, description = "NONE, ALL, or a media ID"),
        ("channel_feeds" = Option<String>, Query, description = "NONE, ALL, or a feed key"),
        ("playlist_feeds" = Option<String>, Query, description = "NONE, ALL, or a feed key"),
        ("channel_names" = Option<String>, Query, description = "NONE, ALL, or a channel name"),
        ("audio_files" = Option<String>, Query, description = "NONE, ALL, or an artifact file name")
    ),
    responses(
        (status = 200, description = "Confirmation view of surviving cache entries", body = ApiResponse<CacheView>),
        (status = 400, description = "Bad artifact file name")
    ),
    tag = "Admin"
)]
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<ClearCacheQuery>,
) -> impl IntoResponse {
    let media_links = ClearSelector::parse(query.media_links.as_deref());
    let channel_feeds = ClearSelector::parse(query.channel_feeds.as_deref());
    let playlist_feeds = ClearSelector::parse(query.playlist_feeds.as_deref());
    let channel_names = ClearSelector::parse(query.channel_names.as_deref());
    let audio_files = ClearSelector::parse(query.audio_files.as_deref());

    if let ClearSelector::Key(name) = &audio_files {
        // Artifact keys are bare file names; anything path-like is refused.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return ApiError("Bad artifact file name".to_string(), StatusCode::BAD_REQUEST)
                .into_response();
        }
    }

    if [&media_links, &channel_feeds, &playlist_feeds, &channel_names, &audio_files]
        .iter()
        .any(|selector| !selector.is_none())
    {
        info!("Cache clear requested");
    }

    let caches = &state.caches;
    let cleared = ClearedCounts {
        media_links: clear_table(&caches.media_links, &media_links),
        channel_feeds: clear_table(&caches.channel_feeds, &channel_feeds),
        playlist_feeds: clear_table(&caches.playlist_feeds, &playlist_feeds),
        channel_names: clear_table(&caches.channel_names, &channel_names),
        audio_files: clear_artifacts(&state, &audio_files),
    };

    if cleared.media_links > 0 {
        info!("Cleared {} entries from the media link cache", cleared.media_links);
    }
    if cleared.channel_feeds > 0 {
        info!("Cleared {} entries from the channel feed cache", cleared.channel_feeds);
    }
    if cleared.playlist_feeds > 0 {
        info!("Cleared {} entries from the playlist feed cache", cleared.playlist_feeds);
    }
    if cleared.channel_names > 0 {
        info!("Cleared {} entries from the channel name cache", cleared.channel_names);
    }
    if cleared.audio_files > 0 {
        info!("Deleted {} cached artifact(s)", cleared.audio_files);
    }

    let view = CacheView {
        cleared,
        media_links: caches.media_links.keys(),
        channel_feeds: caches.channel_feeds.keys(),
        playlist_feeds: caches.playlist_feeds.keys(),
        channel_names: caches.channel_names.keys(),
        audio_files: state
            .artifacts
            .list()
            .into_iter()
            .map(|file| AudioFileView {
                name: file.name,
                size_bytes: file.size,
            })
            .collect(),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(view, "Cache state")),
    )
        .into_response()
}

fn clear_table(
    table: &crate::infrastructure::cache::TtlCache<String, impl Clone>,
    selector: &ClearSelector,
) -> usize {
    match selector {
        ClearSelector::None => 0,
        ClearSelector::All => table.invalidate_all(),
        ClearSelector::Key(key) => usize::from(table.invalidate(key)),
    }
}

fn clear_artifacts(state: &AppState, selector: &ClearSelector) -> usize {
    match selector {
        ClearSelector::None => 0,
        ClearSelector::All => {
            let mut deleted = 0usize;
            for file in state.artifacts.list() {
                match std::fs::remove_file(&file.path) {
                    Ok(()) => {
                        info!("Deleted {}", file.path.display());
                        deleted += 1;
                    }
                    Err(e) => error!("Error removing file {}: {}", file.path.display(), e),
                }
            }
            deleted
        }
        ClearSelector::Key(name) => {
            let path = state.artifacts.dir().join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted {}", path.display());
                    1
                }
                Err(e) => {
                    error!("Error removing file {}: {}", path.display(), e);
                    0
                }
            }
        }
    }
}
