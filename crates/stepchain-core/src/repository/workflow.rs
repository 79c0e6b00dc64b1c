//! Workflow repository trait definition.
//!
//! Defines the storage interface for workflow definitions, execution runs,
//! and step logs. The infrastructure layer (stepchain-infra) implements this
//! trait with SQLite persistence; engine tests use an in-memory fake.
//!
//! The engine requires that every `create_*`/`update_*` call is durably
//! committed when its future resolves, so a concurrent reader of a run sees
//! monotonic progress and never an inconsistent combination of statuses.

use stepchain_types::error::RepositoryError;
use stepchain_types::workflow::{
    RunStatus, StepLog, StepStatus, WorkflowDefinition, WorkflowRun,
};
use uuid::Uuid;

/// Repository trait for workflow persistence.
///
/// Covers three entity families:
/// - **Definitions:** create/read/list/delete for workflow templates.
/// - **Runs:** create/update/query workflow execution instances.
/// - **Step logs:** create/update/query individual step execution records.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Persist a new workflow definition.
    fn save_definition(
        &self,
        def: &WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow definition by its UUID.
    fn get_definition(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// List workflow definitions, ordered by name.
    fn list_definitions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowDefinition>, RepositoryError>> + Send;

    /// Delete a workflow definition by ID. Returns `true` if it existed.
    fn delete_definition(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Create a new workflow run record.
    fn create_run(
        &self,
        run: &WorkflowRun,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update a run's status (and optionally its error message).
    fn update_run_status(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow run by its UUID.
    fn get_run(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowRun>, RepositoryError>> + Send;

    /// List all runs, newest first.
    fn list_runs(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowRun>, RepositoryError>> + Send;

    /// List runs for a given workflow definition, newest first.
    fn list_runs_for_workflow(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowRun>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Step logs
    // -----------------------------------------------------------------------

    /// Create a new step log entry.
    fn create_step_log(
        &self,
        log: &StepLog,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Update a step log's terminal state: status, output, retries consumed,
    /// and failure message.
    fn update_step_log(
        &self,
        log_id: &Uuid,
        status: StepStatus,
        output: Option<&str>,
        retry_count: u32,
        error: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List all step logs for a given run, in execution order.
    fn list_step_logs(
        &self,
        run_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<StepLog>, RepositoryError>> + Send;
}
