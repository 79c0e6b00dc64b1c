//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::routing::{delete, get, post};
use axum::Router;
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

    let api_routes = Router::new()
        // Workflow CRUD
        .route("/workflows", post(handlers::workflow::create_workflow))
        .route("/workflows", get(handlers::workflow::list_workflows))
        .route("/workflows/{id}", get(handlers::workflow::get_workflow))
        .route("/workflows/{id}", delete(handlers::workflow::delete_workflow))
        // Execution
        .route("/workflows/{id}/run", post(handlers::workflow::run_workflow))
        .route("/workflows/{id}/runs", get(handlers::workflow::list_workflow_runs))
        // Runs
        .route("/runs", get(handlers::workflow::list_runs))
        .route("/runs/{run_id}", get(handlers::workflow::get_run))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
