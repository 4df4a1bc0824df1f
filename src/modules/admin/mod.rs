use axum::routing::get;
use axum::Router;
use crate::state::AppState;

pub mod dto;
pub mod handler;

pub fn router() -> Router<AppState> {
    Router::new().route("/cache", get(handler::clear_cache).post(handler::clear_cache))
}
