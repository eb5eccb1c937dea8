use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::api::handlers;
use crate::system::middleware::request_logger::request_logger;
use crate::system::state::SharedState;

/// Application routes
pub fn configure_routes(state: SharedState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // U601 Upload to Google Sheets
        // ========================================
        .route(
            "/api/u601/connection",
            get(handlers::u601_upload_to_sheets::connection_status),
        )
        .route(
            "/api/u601/headers",
            get(handlers::u601_upload_to_sheets::required_headers),
        )
        .route(
            "/api/u601/upload",
            post(handlers::u601_upload_to_sheets::upload)
                // uploads are not size-limited
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
}
