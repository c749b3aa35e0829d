pub mod extract;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{
    dispatch_job_handler, generate_quiz_handler, generate_summary_handler, health_handler,
    job_status_handler,
};
pub use state::AppState;

/// Builds the API routes over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/resources/{resource_id}/ai/quiz", post(generate_quiz_handler))
        .route("/resources/{resource_id}/ai/summary", post(generate_summary_handler))
        .route("/resources/{resource_id}/ai/jobs", post(dispatch_job_handler))
        .route("/ai/jobs/{job_id}", get(job_status_handler))
        .with_state(app_state)
}
