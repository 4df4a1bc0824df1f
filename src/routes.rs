use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use axum::Router;
use crate::state::AppState;

use tower_http::compression::CompressionLayer;

pub fn configure_routes(_state: AppState) -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(|| async { "ok" }))
        // Feed documents compress well; the audio routes stay uncompressed
        // so Content-Length and ranges describe the real bytes.
        .merge(crate::modules::feed::router().layer(CompressionLayer::new()))
        .merge(crate::modules::media::router())
        .merge(crate::modules::audio::router())
        .merge(crate::modules::admin::router())
}
