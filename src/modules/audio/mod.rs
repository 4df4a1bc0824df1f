use axum::routing::get;
use axum::Router;
use crate::state::AppState;

pub mod handler;
pub mod range;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/audio/{id}",
        get(handler::get_audio).head(handler::head_audio),
    )
}
