use axum::routing::get;
use axum::Router;
use crate::state::AppState;

pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new().route("/video/{id}", get(handler::get_video))
}
