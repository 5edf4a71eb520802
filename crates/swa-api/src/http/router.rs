//! Axum router configuration with middleware.
//!
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Wrapper catalogue
        .route("/tools", get(handlers::tools::list_tools))
        .route("/tools/{*id}", get(handlers::tools::get_tool))
        .route("/demos/{*id}", get(handlers::demos::get_demos))
        // Wrapper jobs
        .route("/tool-processes", post(handlers::tool_process::submit))
        .route("/tool-processes/{job_id}", get(handlers::jobs::get_job))
        // Workflow jobs
        .route("/workflows", get(handlers::workflows::list))
        .route("/workflow-processes", post(handlers::workflow_process::submit))
        .route("/workflow-processes/{job_id}", get(handlers::jobs::get_job))
        .route(
            "/workflow-processes/{job_id}/log",
            get(handlers::workflow_process::get_log),
        )
        // Jobs
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/{job_id}/cancel", post(handlers::jobs::cancel_job))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
