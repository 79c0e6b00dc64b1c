//! Workflow domain types for stepchain.
//!
//! Defines the workflow template (`WorkflowDefinition` and its ordered
//! `StepDefinition`s) and the execution tracking types (`WorkflowRun`,
//! `StepLog`, `RunResult`). Definitions are immutable once created; runs and
//! step logs are mutated only by the workflow engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A named, ordered workflow template.
///
/// Created once by a caller and read-only thereafter. Stored as a JSON blob
/// by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// UUIDv7 assigned at creation.
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Step definitions. Execution order is decided by each step's
    /// `step_order` key, not by position in this vector.
    pub steps: Vec<StepDefinition>,
    /// When the workflow was created.
    pub created_at: DateTime<Utc>,
}

/// One stage of a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// UUIDv7 assigned at creation.
    pub id: Uuid,
    /// Opaque identifier naming which model backend to call.
    pub model: String,
    /// Prompt template sent to the model (with chained context prepended).
    pub prompt: String,
    /// Optional completion criterion. Absent or blank means the step is
    /// satisfied by any output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_criteria: Option<String>,
    /// Number of extra attempts beyond the first.
    #[serde(default)]
    pub retry_limit: u32,
    /// Sort key deciding execution order. Not necessarily contiguous.
    pub step_order: i32,
}

// ---------------------------------------------------------------------------
// Execution status
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Status of an individual step execution within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Workflow Run
// ---------------------------------------------------------------------------

/// A single execution instance of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// UUIDv7 run ID.
    pub id: Uuid,
    /// ID of the workflow definition being executed.
    pub workflow_id: Uuid,
    /// Name of the workflow (denormalized for display).
    pub workflow_name: String,
    /// Current run status.
    pub status: RunStatus,
    /// Error message if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started.
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal status (None while running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution log for a single step within a workflow run.
///
/// `step_order` here is a fresh 0-based index over executed steps assigned
/// by the engine; it is independent of `StepDefinition::step_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    /// UUIDv7 step log ID.
    pub id: Uuid,
    /// Parent workflow run ID.
    pub run_id: Uuid,
    /// 0-based position in the executed sequence.
    pub step_order: u32,
    /// Current step status.
    pub status: StepStatus,
    /// Model output, set only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Retries actually consumed before success or failure.
    pub retry_count: u32,
    /// Failure message, set only on terminal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When step execution started.
    pub started_at: DateTime<Utc>,
    /// When step execution reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepLog {
    /// Create a RUNNING log entry for the step at `step_order`.
    pub fn started(run_id: Uuid, step_order: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            run_id,
            step_order,
            status: StepStatus::Running,
            output: None,
            retry_count: 0,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run Result
// ---------------------------------------------------------------------------

/// Result of a workflow run, returned synchronously to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether every step completed.
    pub success: bool,
    /// Outputs of the completed steps, in execution order. On failure this
    /// holds only the outputs collected before the failing step.
    pub step_outputs: Vec<String>,
    /// Message of the failure that halted the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
