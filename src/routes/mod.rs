use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod documents;
pub mod export;
pub mod files;
pub mod health;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::register_document),
        )
        .route("/next-number", get(documents::next_document_number))
        .route("/export", get(export::download_search_results))
        .route(
            "/:key",
            patch(documents::update_document).delete(documents::delete_document),
        )
        .route("/:id/approve", post(documents::approve_document));

    let files_routes = Router::new().route("/preview", get(files::file_preview));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/files", files_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
