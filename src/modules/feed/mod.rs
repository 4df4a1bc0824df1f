use axum::routing::get;
use axum::Router;
use crate::state::AppState;

pub mod handler;
pub mod rss;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/channel/{id}",
            get(handler::channel_feed).head(handler::head_feed),
        )
        .route(
            "/channel/{id}/{kind}",
            get(handler::channel_feed_kind).head(handler::head_feed),
        )
        .route(
            "/playlist/{id}",
            get(handler::playlist_feed).head(handler::head_feed),
        )
        .route(
            "/playlist/{id}/{kind}",
            get(handler::playlist_feed_kind).head(handler::head_feed),
        )
        .route("/user/{*name}", get(handler::user_feed))
}
