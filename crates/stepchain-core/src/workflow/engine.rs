//! Sequential workflow engine.
//!
//! Drives a workflow definition through its steps in ascending `step_order`,
//! chaining each step's output into the next step's prompt and recording
//! durable run/step state transitions through the repository port.
//!
//! Once the run record exists, `run` is infallible at the type level: every
//! failure (model call, criteria exhaustion, mid-run persistence error) is
//! folded into a FAILED run and reported through `RunResult`.

use std::sync::Arc;

use chrono::Utc;
use stepchain_types::workflow::{
    RunResult, RunStatus, StepLog, StepStatus, WorkflowDefinition, WorkflowRun,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::llm::ModelCaller;
use crate::repository::workflow::WorkflowRepository;
use crate::workflow::executor::StepExecutor;
use crate::workflow::state::{run_transition, step_transition};

/// Failure creating the initial run record. Nothing was executed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create run record: {0}")]
    RunCreation(#[source] stepchain_types::error::RepositoryError),
}

/// Outcome of a finished run: the durable run ID plus the in-memory result.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub result: RunResult,
}

/// The workflow engine. Owns a shared repository handle and a step executor
/// wrapping the model backend.
pub struct WorkflowEngine<R, M> {
    repository: Arc<R>,
    executor: StepExecutor<M>,
}

impl<R: WorkflowRepository, M: ModelCaller> WorkflowEngine<R, M> {
    pub fn new(repository: Arc<R>, model_caller: M) -> Self {
        Self {
            repository,
            executor: StepExecutor::new(model_caller),
        }
    }

    /// Execute a workflow definition from start to finish.
    ///
    /// Steps run one at a time in ascending `step_order` (ties keep their
    /// position in the definition). Execution halts at the first step that
    /// exhausts its retries; remaining steps are never started and get no
    /// step logs.
    #[instrument(skip_all, fields(workflow = %definition.name))]
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<CompletedRun, EngineError> {
        let mut steps = definition.steps.clone();
        steps.sort_by_key(|s| s.step_order);

        let run = WorkflowRun {
            id: Uuid::now_v7(),
            workflow_id: definition.id,
            workflow_name: definition.name.clone(),
            status: RunStatus::Running,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.repository
            .create_run(&run)
            .await
            .map_err(EngineError::RunCreation)?;
        info!(run_id = %run.id, steps = steps.len(), "workflow run started");

        let mut step_outputs: Vec<String> = Vec::new();
        let mut run_error: Option<String> = None;

        for (index, step) in steps.iter().enumerate() {
            let log = StepLog::started(run.id, index as u32);
            if let Err(err) = self.repository.create_step_log(&log).await {
                run_error = Some(format!("persistence error: {err}"));
                break;
            }

            let previous = step_outputs.last().map(String::as_str);
            match self.executor.execute(step, previous).await {
                Ok(outcome) => {
                    if let Err(err) = self
                        .close_step_log(
                            &log.id,
                            StepStatus::Completed,
                            Some(&outcome.output),
                            outcome.retry_count,
                            None,
                        )
                        .await
                    {
                        run_error = Some(format!("persistence error: {err}"));
                        break;
                    }
                    step_outputs.push(outcome.output);
                }
                Err(failure) => {
                    let message =
                        format!("step {} failed: {}", step.step_order, failure);
                    warn!(run_id = %run.id, step_order = step.step_order, %failure, "step exhausted its retries");
                    if let Err(err) = self
                        .close_step_log(
                            &log.id,
                            StepStatus::Failed,
                            None,
                            step.retry_limit,
                            Some(&failure.to_string()),
                        )
                        .await
                    {
                        run_error = Some(format!("persistence error: {err}"));
                    } else {
                        run_error = Some(message);
                    }
                    break;
                }
            }
        }

        let success = run_error.is_none();
        let final_status = if success {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.close_run(&run.id, final_status, run_error.as_deref())
            .await;
        info!(run_id = %run.id, status = ?final_status, "workflow run finished");

        Ok(CompletedRun {
            run_id: run.id,
            result: RunResult {
                success,
                step_outputs,
                error_message: run_error,
            },
        })
    }

    /// Move a step log from RUNNING to its terminal state.
    async fn close_step_log(
        &self,
        log_id: &Uuid,
        status: StepStatus,
        output: Option<&str>,
        retry_count: u32,
        error_msg: Option<&str>,
    ) -> Result<(), stepchain_types::error::RepositoryError> {
        match step_transition(StepStatus::Running, status) {
            Ok(status) => {
                self.repository
                    .update_step_log(log_id, status, output, retry_count, error_msg)
                    .await
            }
            Err(err) => {
                error!(%log_id, %err, "refusing invalid step transition");
                Ok(())
            }
        }
    }

    /// Move the run record from RUNNING to its terminal state. Failures here
    /// are logged but do not alter the already-computed result.
    async fn close_run(&self, run_id: &Uuid, status: RunStatus, error_msg: Option<&str>) {
        match run_transition(RunStatus::Running, status) {
            Ok(status) => {
                if let Err(err) = self
                    .repository
                    .update_run_status(run_id, status, error_msg)
                    .await
                {
                    error!(%run_id, %err, "failed to persist terminal run status");
                }
            }
            Err(err) => {
                error!(%run_id, %err, "refusing invalid run transition");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use stepchain_types::error::RepositoryError;
    use stepchain_types::llm::ModelCallError;
    use stepchain_types::workflow::StepDefinition;

    use super::*;

    #[derive(Default)]
    struct MemoryState {
        runs: HashMap<Uuid, WorkflowRun>,
        logs: Vec<StepLog>,
    }

    /// In-memory repository capturing every run and step log write.
    #[derive(Default)]
    struct MemoryRepo {
        state: Mutex<MemoryState>,
        fail_step_log_creation: bool,
    }

    impl MemoryRepo {
        fn run(&self, id: &Uuid) -> WorkflowRun {
            self.state.lock().unwrap().runs.get(id).unwrap().clone()
        }

        fn logs(&self, run_id: &Uuid) -> Vec<StepLog> {
            self.state
                .lock()
                .unwrap()
                .logs
                .iter()
                .filter(|l| l.run_id == *run_id)
                .cloned()
                .collect()
        }
    }

    impl WorkflowRepository for MemoryRepo {
        async fn save_definition(&self, _def: &WorkflowDefinition) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn get_definition(
            &self,
            _id: &Uuid,
        ) -> Result<Option<WorkflowDefinition>, RepositoryError> {
            Ok(None)
        }

        async fn list_definitions(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn delete_definition(&self, _id: &Uuid) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn create_run(&self, run: &WorkflowRun) -> Result<(), RepositoryError> {
            self.state.lock().unwrap().runs.insert(run.id, run.clone());
            Ok(())
        }

        async fn update_run_status(
            &self,
            run_id: &Uuid,
            status: RunStatus,
            error: Option<&str>,
        ) -> Result<(), RepositoryError> {
            let mut state = self.state.lock().unwrap();
            let run = state.runs.get_mut(run_id).ok_or(RepositoryError::NotFound)?;
            run.status = status;
            run.error = error.map(|s| s.to_string());
            run.completed_at = Some(Utc::now());
            Ok(())
        }

        async fn get_run(&self, run_id: &Uuid) -> Result<Option<WorkflowRun>, RepositoryError> {
            Ok(self.state.lock().unwrap().runs.get(run_id).cloned())
        }

        async fn list_runs(&self, _limit: u32) -> Result<Vec<WorkflowRun>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn list_runs_for_workflow(
            &self,
            _workflow_id: &Uuid,
            _limit: u32,
        ) -> Result<Vec<WorkflowRun>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn create_step_log(&self, log: &StepLog) -> Result<(), RepositoryError> {
            if self.fail_step_log_creation {
                return Err(RepositoryError::Connection);
            }
            self.state.lock().unwrap().logs.push(log.clone());
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
            let mut state = self.state.lock().unwrap();
            let log = state
                .logs
                .iter_mut()
                .find(|l| l.id == *log_id)
                .ok_or(RepositoryError::NotFound)?;
            log.status = status;
            log.output = output.map(|s| s.to_string());
            log.retry_count = retry_count;
            log.error = error.map(|s| s.to_string());
            log.completed_at = Some(Utc::now());
            Ok(())
        }

        async fn list_step_logs(&self, run_id: &Uuid) -> Result<Vec<StepLog>, RepositoryError> {
            Ok(self.logs(run_id))
        }
    }

    /// Model caller that maps each incoming prompt to the next scripted
    /// response, in call order.
    struct ScriptedModel {
        responses: Mutex<Vec<Result<String, ModelCallError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, ModelCallError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl ModelCaller for Arc<ScriptedModel> {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn call(&self, _model: &str, prompt: &str) -> Result<String, ModelCallError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn step(order: i32, criteria: Option<&str>, retry_limit: u32) -> StepDefinition {
        StepDefinition {
            id: Uuid::now_v7(),
            model: "test-model".to_string(),
            prompt: format!("prompt {order}"),
            completion_criteria: criteria.map(|s| s.to_string()),
            retry_limit,
            step_order: order,
        }
    }

    fn definition(steps: Vec<StepDefinition>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: Uuid::now_v7(),
            name: "test workflow".to_string(),
            description: None,
            steps,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_two_step_happy_path_chains_context() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![
            Ok("first output".to_string()),
            Ok("second output".to_string()),
        ]);
        let engine = WorkflowEngine::new(repo.clone(), model.clone());

        let def = definition(vec![step(0, None, 0), step(1, None, 0)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(completed.result.success);
        assert!(completed.result.error_message.is_none());
        assert_eq!(
            completed.result.step_outputs,
            vec!["first output".to_string(), "second output".to_string()]
        );

        let run = repo.run(&completed.run_id);
        assert_eq!(run.status, RunStatus::Success);
        assert!(run.error.is_none());
        assert!(run.completed_at.is_some());

        let logs = repo.logs(&completed.run_id);
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.status == StepStatus::Completed));
        assert_eq!(logs[0].output.as_deref(), Some("first output"));
        assert_eq!(logs[1].output.as_deref(), Some("second output"));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts[0], "prompt 0");
        assert_eq!(
            prompts[1],
            "Previous step output:\nfirst output\n\nCurrent step:\nprompt 1"
        );
    }

    #[tokio::test]
    async fn test_criteria_retry_then_success() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![
            Ok("not there yet".to_string()),
            Ok("status: DONE".to_string()),
        ]);
        let engine = WorkflowEngine::new(repo.clone(), model);

        let def = definition(vec![step(0, Some("done"), 2)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(completed.result.success);
        let logs = repo.logs(&completed.run_id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Completed);
        assert_eq!(logs[0].retry_count, 1);
        assert_eq!(logs[0].output.as_deref(), Some("status: DONE"));
    }

    #[tokio::test]
    async fn test_exhaustion_fails_run_and_halts() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![
            Ok("wrong".to_string()),
            Ok("still wrong".to_string()),
            Ok("never right".to_string()),
        ]);
        let engine = WorkflowEngine::new(repo.clone(), model);

        let def = definition(vec![step(0, Some("done"), 2), step(1, None, 0)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(!completed.result.success);
        assert!(completed.result.step_outputs.is_empty());
        let message = completed.result.error_message.unwrap();
        assert!(message.contains("step 0 failed"), "message: {message}");

        let run = repo.run(&completed.run_id);
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error.is_some());

        // The second step was never started.
        let logs = repo.logs(&completed.run_id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Failed);
        assert_eq!(logs[0].retry_count, 2);
        assert!(logs[0].output.is_none());
        assert!(logs[0].error.is_some());
    }

    #[tokio::test]
    async fn test_empty_workflow_succeeds_immediately() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![]);
        let engine = WorkflowEngine::new(repo.clone(), model);

        let completed = engine.run(&definition(vec![])).await.unwrap();

        assert!(completed.result.success);
        assert!(completed.result.step_outputs.is_empty());
        assert_eq!(repo.run(&completed.run_id).status, RunStatus::Success);
        assert!(repo.logs(&completed.run_id).is_empty());
    }

    #[tokio::test]
    async fn test_steps_execute_in_step_order_not_vec_order() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![
            Ok("from step 1".to_string()),
            Ok("from step 5".to_string()),
        ]);
        let engine = WorkflowEngine::new(repo.clone(), model.clone());

        // Definition lists the later step first; sparse orders are fine.
        let def = definition(vec![step(5, None, 0), step(1, None, 0)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(completed.result.success);
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts[0], "prompt 1");
        assert!(prompts[1].ends_with("Current step:\nprompt 5"));

        // Step logs carry the 0-based execution index.
        let logs = repo.logs(&completed.run_id);
        assert_eq!(logs[0].step_order, 0);
        assert_eq!(logs[1].step_order, 1);
    }

    #[tokio::test]
    async fn test_hard_model_failure_message_survives_to_run() {
        let repo = Arc::new(MemoryRepo::default());
        let model = ScriptedModel::new(vec![Err(ModelCallError::Transport(
            "connection refused".to_string(),
        ))]);
        let engine = WorkflowEngine::new(repo.clone(), model);

        let def = definition(vec![step(0, None, 0)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(!completed.result.success);
        let message = completed.result.error_message.unwrap();
        assert!(message.contains("connection refused"), "message: {message}");

        let logs = repo.logs(&completed.run_id);
        assert!(logs[0].error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_mid_run_persistence_failure_fails_the_run() {
        let repo = Arc::new(MemoryRepo {
            fail_step_log_creation: true,
            ..Default::default()
        });
        let model = ScriptedModel::new(vec![Ok("unused".to_string())]);
        let engine = WorkflowEngine::new(repo.clone(), model);

        let def = definition(vec![step(0, None, 0)]);
        let completed = engine.run(&def).await.unwrap();

        assert!(!completed.result.success);
        let message = completed.result.error_message.unwrap();
        assert!(message.contains("persistence error"), "message: {message}");
        assert_eq!(repo.run(&completed.run_id).status, RunStatus::Failed);
    }
}
