//! Workflow CRUD and execution handlers for the REST API.
//!
//! Endpoints for managing workflow definitions, running them synchronously,
//! and inspecting runs with step-level logs.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stepchain_core::repository::workflow::WorkflowRepository;
use stepchain_types::workflow::{RunResult, StepLog, WorkflowDefinition, WorkflowRun};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::input::WorkflowInput;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameters and response bodies
// ---------------------------------------------------------------------------

/// Query parameters for listing runs.
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    /// Maximum number of runs to return (default 20).
    #[serde(default = "default_run_limit")]
    pub limit: u32,
}

fn default_run_limit() -> u32 {
    20
}

/// Response body for a synchronous workflow run.
#[derive(Debug, Serialize)]
pub struct RunWorkflowResponse {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub result: RunResult,
}

/// Response body for a run detail view: the run plus its step logs.
#[derive(Debug, Serialize)]
pub struct RunDetailResponse {
    #[serde(flatten)]
    pub run: WorkflowRun,
    pub steps: Vec<StepLog>,
}

// ---------------------------------------------------------------------------
// Workflow CRUD handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows - Create a new workflow definition.
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<WorkflowInput>,
) -> Result<Json<ApiResponse<WorkflowDefinition>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = body.into_definition().map_err(AppError::Validation)?;
    state.repo.save_definition(&def).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let link = format!("/api/v1/workflows/{}", def.id);
    let resp = ApiResponse::success(def, request_id, elapsed).with_link("self", &link);

    Ok(Json(resp))
}

/// GET /api/v1/workflows - List all workflow definitions.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WorkflowDefinition>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let defs = state.repo.list_definitions().await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(defs, request_id, elapsed)
        .with_link("self", "/api/v1/workflows");

    Ok(Json(resp))
}

/// GET /api/v1/workflows/:id - Get a workflow definition by ID.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkflowDefinition>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = state
        .repo
        .get_definition(&id)
        .await?
        .ok_or(AppError::WorkflowNotFound)?;

    let elapsed = start.elapsed().as_millis() as u64;
    let link = format!("/api/v1/workflows/{id}");
    let resp = ApiResponse::success(def, request_id, elapsed).with_link("self", &link);

    Ok(Json(resp))
}

/// DELETE /api/v1/workflows/:id - Delete a workflow definition.
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let deleted = state.repo.delete_definition(&id).await?;
    if !deleted {
        return Err(AppError::WorkflowNotFound);
    }

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({ "deleted": true }),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

// ---------------------------------------------------------------------------
// Execution handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/:id/run - Execute a workflow synchronously.
///
/// Blocks until the run reaches a terminal state, then returns the run ID
/// and the collected step outputs. A failed run is still a 200; the failure
/// lives in the result body.
pub async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RunWorkflowResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = state
        .repo
        .get_definition(&id)
        .await?
        .ok_or(AppError::WorkflowNotFound)?;

    let engine = state
        .engine
        .as_ref()
        .ok_or(AppError::ModelBackendUnconfigured)?;

    let completed = engine
        .run(&def)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let link = format!("/api/v1/runs/{}", completed.run_id);
    let resp = ApiResponse::success(
        RunWorkflowResponse {
            run_id: completed.run_id,
            result: completed.result,
        },
        request_id,
        elapsed,
    )
    .with_link("run", &link);

    Ok(Json(resp))
}

/// GET /api/v1/workflows/:id/runs - List runs for one workflow.
pub async fn list_workflow_runs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<ApiResponse<Vec<WorkflowRun>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if state.repo.get_definition(&id).await?.is_none() {
        return Err(AppError::WorkflowNotFound);
    }
    let runs = state.repo.list_runs_for_workflow(&id, query.limit).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(runs, request_id, elapsed)))
}

/// GET /api/v1/runs - List recent runs across all workflows.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<ApiResponse<Vec<WorkflowRun>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let runs = state.repo.list_runs(query.limit).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(runs, request_id, elapsed)))
}

/// GET /api/v1/runs/:run_id - Get a run with its step logs.
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RunDetailResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let run = state
        .repo
        .get_run(&run_id)
        .await?
        .ok_or(AppError::RunNotFound)?;
    let steps = state.repo.list_step_logs(&run_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let link = format!("/api/v1/runs/{run_id}");
    let resp = ApiResponse::success(RunDetailResponse { run, steps }, request_id, elapsed)
        .with_link("self", &link);

    Ok(Json(resp))
}
