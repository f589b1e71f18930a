use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

pub mod auth;
pub mod billing;
pub mod catalog;
pub mod feedback;
pub mod progress;
pub mod state;
pub mod viewer;

pub use state::AppState;
pub use viewer::Viewer;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Session
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/session", get(auth::current_session))
        // Catalog
        .route("/categories", get(catalog::list_categories))
        .route("/categories/:id/videos", get(catalog::category_videos))
        .route("/videos", get(catalog::list_videos))
        .route("/videos/:id", get(catalog::get_video))
        .route("/videos/:id/stream", get(catalog::stream))
        .route("/home", get(catalog::home))
        .route("/recommendations", get(catalog::recommendations))
        // Watch progress
        .route("/progress", get(progress::list_progress))
        .route("/progress/:id", post(progress::save_progress))
        .route("/progress/:id/resume", get(progress::resume))
        // Billing
        .route("/videos/:id/purchase", post(billing::purchase))
        .route("/subscription", post(billing::subscribe))
        .route("/account", get(billing::account))
        .route("/stats", get(billing::learning_stats))
        // Feedback
        .route(
            "/videos/:id/feedback",
            get(feedback::get_feedback).put(feedback::toggle_feedback),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
