//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `stepchain-core` using sqlx with
//! split read/write pools. Workflow definitions are stored as JSON blobs.
//! Runs and step logs are flat rows so they can be queried and updated
//! without deserializing the whole definition.

use chrono::{DateTime, Utc};
use sqlx::Row;
use stepchain_core::repository::workflow::WorkflowRepository;
use stepchain_types::error::RepositoryError;
use stepchain_types::workflow::{
    RunStatus, StepLog, StepStatus, WorkflowDefinition, WorkflowRun,
};
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct WorkflowDefRow {
    definition: String,
}

impl WorkflowDefRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            definition: row.try_get("definition")?,
        })
    }

    fn into_definition(self) -> Result<WorkflowDefinition, RepositoryError> {
        serde_json::from_str(&self.definition)
            .map_err(|e| RepositoryError::Query(format!("invalid workflow definition JSON: {e}")))
    }
}

struct WorkflowRunRow {
    id: String,
    workflow_id: String,
    workflow_name: String,
    status: String,
    error: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl WorkflowRunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            workflow_name: row.try_get("workflow_name")?,
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_run(self) -> Result<WorkflowRun, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let workflow_id = parse_uuid(&self.workflow_id)?;
        let status: RunStatus =
            serde_json::from_value(serde_json::Value::String(self.status.clone()))
                .map_err(|_| RepositoryError::Query(format!("invalid run status: {}", self.status)))?;

        let created_at = parse_datetime(&self.created_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(WorkflowRun {
            id,
            workflow_id,
            workflow_name: self.workflow_name,
            status,
            error: self.error,
            created_at,
            completed_at,
        })
    }
}

struct StepLogRow {
    id: String,
    run_id: String,
    step_order: i64,
    status: String,
    output: Option<String>,
    retry_count: i64,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl StepLogRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            step_order: row.try_get("step_order")?,
            status: row.try_get("status")?,
            output: row.try_get("output")?,
            retry_count: row.try_get("retry_count")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_step_log(self) -> Result<StepLog, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let run_id = parse_uuid(&self.run_id)?;
        let status: StepStatus =
            serde_json::from_value(serde_json::Value::String(self.status.clone())).map_err(
                |_| RepositoryError::Query(format!("invalid step status: {}", self.status)),
            )?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(StepLog {
            id,
            run_id,
            step_order: self.step_order as u32,
            status,
            output: self.output,
            retry_count: self.retry_count as u32,
            error: self.error,
            started_at,
            completed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn status_str<T: serde::Serialize>(status: &T) -> Result<String, RepositoryError> {
    match serde_json::to_value(status) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(RepositoryError::Query("unserializable status".to_string())),
    }
}

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn save_definition(&self, def: &WorkflowDefinition) -> Result<(), RepositoryError> {
        let definition_json = serde_json::to_string(def)
            .map_err(|e| RepositoryError::Query(format!("serialize definition: {e}")))?;

        sqlx::query(
            "INSERT INTO workflows (id, name, definition, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(def.id.to_string())
        .bind(&def.name)
        .bind(&definition_json)
        .bind(format_datetime(&def.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_definition(
        &self,
        id: &Uuid,
    ) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WorkflowDefRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_definition()?))
            }
            None => Ok(None),
        }
    }

    async fn list_definitions(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let rows = sqlx::query("SELECT definition FROM workflows ORDER BY name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                WorkflowDefRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_definition()
            })
            .collect()
    }

    async fn delete_definition(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_run(&self, run: &WorkflowRun) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO workflow_runs (id, workflow_id, workflow_name, status, error, created_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run.id.to_string())
        .bind(run.workflow_id.to_string())
        .bind(&run.workflow_name)
        .bind(status_str(&run.status)?)
        .bind(&run.error)
        .bind(format_datetime(&run.created_at))
        .bind(run.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_run_status(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE workflow_runs SET status = ?, error = ?, completed_at = ? WHERE id = ?",
        )
        .bind(status_str(&status)?)
        .bind(error)
        .bind(format_datetime(&Utc::now()))
        .bind(run_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> Result<Option<WorkflowRun>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, workflow_id, workflow_name, status, error, created_at, completed_at
             FROM workflow_runs WHERE id = ?",
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WorkflowRunRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_run()?))
            }
            None => Ok(None),
        }
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<WorkflowRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, workflow_id, workflow_name, status, error, created_at, completed_at
             FROM workflow_runs ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                WorkflowRunRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_run()
            })
            .collect()
    }

    async fn list_runs_for_workflow(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<WorkflowRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, workflow_id, workflow_name, status, error, created_at, completed_at
             FROM workflow_runs WHERE workflow_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(workflow_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                WorkflowRunRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_run()
            })
            .collect()
    }

    async fn create_step_log(&self, log: &StepLog) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO workflow_step_logs (id, run_id, step_order, status, output, retry_count, error, started_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(log.run_id.to_string())
        .bind(log.step_order as i64)
        .bind(status_str(&log.status)?)
        .bind(&log.output)
        .bind(log.retry_count as i64)
        .bind(&log.error)
        .bind(format_datetime(&log.started_at))
        .bind(log.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_step_log(
        &self,
        log_id: &Uuid,
        status: StepStatus,
        output: Option<&str>,
        retry_count: u32,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE workflow_step_logs
             SET status = ?, output = ?, retry_count = ?, error = ?, completed_at = ?
             WHERE id = ?",
        )
        .bind(status_str(&status)?)
        .bind(output)
        .bind(retry_count as i64)
        .bind(error)
        .bind(format_datetime(&Utc::now()))
        .bind(log_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_step_logs(&self, run_id: &Uuid) -> Result<Vec<StepLog>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, run_id, step_order, status, output, retry_count, error, started_at, completed_at
             FROM workflow_step_logs WHERE run_id = ? ORDER BY step_order ASC",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                StepLogRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_step_log()
            })
            .collect()
    }
}
