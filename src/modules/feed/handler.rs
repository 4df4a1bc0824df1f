use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, info};

use super::service::{FeedKind, FeedService};
use crate::common::response::ApiError;
use crate::state::AppState;

const FEED_CONTENT_TYPE: &str = "application/rss+xml";

#[derive(Deserialize)]
pub struct FeedQuery {
    /// Cap on how many upstream listing pages to walk.
    pub max: Option<usize>,
}

/// RSS feed of a channel's uploads.
#[utoipa::path(
    get,
    path = "/channel/{id}",
    params(
        ("id" = String, Path, description = "Channel ID or name"),
        ("max" = Option<usize>, Query, description = "Maximum listing pages to fetch")
    ),
    responses(
        (status = 200, description = "RSS feed", content_type = "application/rss+xml"),
        (status = 404, description = "Unknown feed kind"),
        (status = 502, description = "Upstream lookup failed")
    ),
    tag = "Feeds"
)]
pub async fn channel_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_channel(state, id, None, query.max, &headers).await
}

/// RSS feed of a channel's uploads, with explicit enclosure kind.
#[utoipa::path(
    get,
    path = "/channel/{id}/{kind}",
    params(
        ("id" = String, Path, description = "Channel ID or name"),
        ("kind" = String, Path, description = "Enclosure kind: video or audio"),
        ("max" = Option<usize>, Query, description = "Maximum listing pages to fetch")
    ),
    responses(
        (status = 200, description = "RSS feed", content_type = "application/rss+xml"),
        (status = 404, description = "Unknown feed kind"),
        (status = 502, description = "Upstream lookup failed")
    ),
    tag = "Feeds"
)]
pub async fn channel_feed_kind(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_channel(state, id, Some(kind), query.max, &headers).await
}

async fn serve_channel(
    state: AppState,
    id: String,
    kind: Option<String>,
    max_pages: Option<usize>,
    headers: &HeaderMap,
) -> Response {
    let Some(kind) = FeedKind::parse(kind.as_deref()) else {
        return ApiError("Unknown feed kind".to_string(), StatusCode::NOT_FOUND).into_response();
    };
    let base = request_base(headers);
    match FeedService::channel_feed(&state, &id, kind, &base, max_pages).await {
        Ok(feed) => rss_response(feed),
        Err(e) => {
            error!("Error building channel feed for {}: {}", id, e);
            ApiError("Error downloading channel".to_string(), StatusCode::BAD_GATEWAY)
                .into_response()
        }
    }
}

/// RSS feed of a playlist.
#[utoipa::path(
    get,
    path = "/playlist/{id}",
    params(
        ("id" = String, Path, description = "Playlist ID"),
        ("max" = Option<usize>, Query, description = "Maximum listing pages to fetch")
    ),
    responses(
        (status = 200, description = "RSS feed", content_type = "application/rss+xml"),
        (status = 404, description = "Unknown feed kind"),
        (status = 502, description = "Upstream lookup failed")
    ),
    tag = "Feeds"
)]
pub async fn playlist_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_playlist(state, id, None, query.max, &headers).await
}

/// RSS feed of a playlist, with explicit enclosure kind.
#[utoipa::path(
    get,
    path = "/playlist/{id}/{kind}",
    params(
        ("id" = String, Path, description = "Playlist ID"),
        ("kind" = String, Path, description = "Enclosure kind: video or audio"),
        ("max" = Option<usize>, Query, description = "Maximum listing pages to fetch")
    ),
    responses(
        (status = 200, description = "RSS feed", content_type = "application/rss+xml"),
        (status = 404, description = "Unknown feed kind"),
        (status = 502, description = "Upstream lookup failed")
    ),
    tag = "Feeds"
)]
pub async fn playlist_feed_kind(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Query(query): Query<FeedQuery>,
    headers: HeaderMap,
) -> Response {
    serve_playlist(state, id, Some(kind), query.max, &headers).await
}

async fn serve_playlist(
    state: AppState,
    id: String,
    kind: Option<String>,
    max_pages: Option<usize>,
    headers: &HeaderMap,
) -> Response {
    let Some(kind) = FeedKind::parse(kind.as_deref()) else {
        return ApiError("Unknown feed kind".to_string(), StatusCode::NOT_FOUND).into_response();
    };
    let base = request_base(headers);
    match FeedService::playlist_feed(&state, &id, kind, &base, max_pages).await {
        Ok(feed) => rss_response(feed),
        Err(e) => {
            error!("Error building playlist feed for {}: {}", id, e);
            ApiError("Error downloading playlist".to_string(), StatusCode::BAD_GATEWAY)
                .into_response()
        }
    }
}

/// Resolve a channel name and redirect to its feed.
#[utoipa::path(
    get,
    path = "/user/{name}",
    params(
        ("name" = String, Path, description = "Channel name, optionally with a trailing /audio or /video")
    ),
    responses(
        (status = 307, description = "Redirect to the channel feed"),
        (status = 404, description = "Name could not be resolved")
    ),
    tag = "Feeds"
)]
pub async fn user_feed(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    info!("Handling channel by name: {}", name);
    let name = name.trim_start_matches('@');
    // "name/audio" keeps its suffix through the redirect.
    let (name, suffix) = match name.split_once('/') {
        Some((name, rest)) => (name.to_string(), Some(rest.to_string())),
        None => (name.to_string(), None),
    };
    match FeedService::channel_id_for_name(&state, &name).await {
        Some(id) => {
            let mut target = format!("/channel/{id}");
            if let Some(suffix) = suffix {
                target.push('/');
                target.push_str(&suffix);
            }
            info!("Redirect to {}", target);
            Redirect::temporary(&target).into_response()
        }
        None => ApiError("Unknown channel name".to_string(), StatusCode::NOT_FOUND)
            .into_response(),
    }
}

/// Feed endpoints advertise their content type on HEAD probes.
pub async fn head_feed() -> impl IntoResponse {
    [
        (header::CONTENT_TYPE, FEED_CONTENT_TYPE),
        (header::ACCEPT_RANGES, "bytes"),
    ]
}

fn rss_response(feed: String) -> Response {
    ([(header::CONTENT_TYPE, FEED_CONTENT_TYPE)], feed).into_response()
}

/// Reconstructs the externally visible base URL from proxy-aware headers,
/// falling back to the Host header.
fn request_base(headers: &HeaderMap) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}
