//! Single-step execution with retries.

use stepchain_types::llm::ModelCallError;
use stepchain_types::workflow::StepDefinition;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::ModelCaller;
use crate::workflow::completion::criteria_satisfied;
use crate::workflow::context::build_prompt;

/// Why a single attempt (and, after exhaustion, the whole step) failed.
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error("completion criteria not met: expected output to contain {criteria:?}")]
    CriteriaNotMet { criteria: String },

    #[error("model call failed: {0}")]
    ModelCall(#[from] ModelCallError),
}

/// A successful step: the model output that satisfied the criteria and the
/// zero-based index of the attempt that produced it.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub output: String,
    pub retry_count: u32,
}

/// Runs one step definition against a model, retrying on both hard call
/// failures and criteria misses.
pub struct StepExecutor<M> {
    model_caller: M,
}

impl<M: ModelCaller> StepExecutor<M> {
    pub fn new(model_caller: M) -> Self {
        Self { model_caller }
    }

    /// Execute a step, making up to `retry_limit + 1` attempts.
    ///
    /// A criteria miss is retried exactly like a failed model call. On
    /// exhaustion the failure from the final attempt is returned.
    pub async fn execute(
        &self,
        step: &StepDefinition,
        previous_output: Option<&str>,
    ) -> Result<StepOutcome, StepFailure> {
        let prompt = build_prompt(&step.prompt, previous_output);
        let mut last_failure = None;

        for attempt in 0..=step.retry_limit {
            debug!(
                step_order = step.step_order,
                model = %step.model,
                attempt,
                "executing step attempt"
            );

            match self.model_caller.call(&step.model, &prompt).await {
                Ok(output) => {
                    if criteria_satisfied(&output, step.completion_criteria.as_deref()) {
                        return Ok(StepOutcome {
                            output,
                            retry_count: attempt,
                        });
                    }
                    let criteria = step
                        .completion_criteria
                        .clone()
                        .unwrap_or_default();
                    warn!(
                        step_order = step.step_order,
                        attempt, "step output did not satisfy completion criteria"
                    );
                    last_failure = Some(StepFailure::CriteriaNotMet { criteria });
                }
                Err(err) => {
                    warn!(
                        step_order = step.step_order,
                        attempt,
                        error = %err,
                        "model call failed"
                    );
                    last_failure = Some(StepFailure::ModelCall(err));
                }
            }
        }

        // retry_limit + 1 attempts always run at least once, so a failure
        // was recorded before we got here.
        Err(last_failure.unwrap_or(StepFailure::CriteriaNotMet {
            criteria: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use stepchain_types::llm::ModelCallError;
    use uuid::Uuid;

    use super::*;

    /// Scripted model caller: pops one canned result per call and records the
    /// prompts it was given.
    struct ScriptedCaller {
        responses: Mutex<Vec<Result<String, ModelCallError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCaller {
        fn new(responses: Vec<Result<String, ModelCallError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl ModelCaller for &ScriptedCaller {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn call(&self, _model: &str, prompt: &str) -> Result<String, ModelCallError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn step(retry_limit: u32, criteria: Option<&str>) -> StepDefinition {
        StepDefinition {
            id: Uuid::now_v7(),
            model: "test-model".to_string(),
            prompt: "do the thing".to_string(),
            completion_criteria: criteria.map(|s| s.to_string()),
            retry_limit,
            step_order: 0,
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success_has_zero_retry_count() {
        let caller = ScriptedCaller::new(vec![Ok("all DONE".to_string())]);
        let executor = StepExecutor::new(&caller);

        let outcome = executor.execute(&step(3, Some("done")), None).await.unwrap();
        assert_eq!(outcome.output, "all DONE");
        assert_eq!(outcome.retry_count, 0);
        assert_eq!(caller.calls(), 1);
    }

    #[tokio::test]
    async fn test_criteria_miss_is_retried() {
        let caller = ScriptedCaller::new(vec![
            Ok("not yet".to_string()),
            Ok("now it is done".to_string()),
        ]);
        let executor = StepExecutor::new(&caller);

        let outcome = executor.execute(&step(2, Some("done")), None).await.unwrap();
        assert_eq!(outcome.output, "now it is done");
        assert_eq!(outcome.retry_count, 1);
        assert_eq!(caller.calls(), 2);
    }

    #[tokio::test]
    async fn test_hard_failure_then_success() {
        let caller = ScriptedCaller::new(vec![
            Err(ModelCallError::Transport("connection reset".to_string())),
            Ok("ok".to_string()),
        ]);
        let executor = StepExecutor::new(&caller);

        let outcome = executor.execute(&step(1, None), None).await.unwrap();
        assert_eq!(outcome.output, "ok");
        assert_eq!(outcome.retry_count, 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_failure() {
        let caller = ScriptedCaller::new(vec![
            Err(ModelCallError::Transport("first".to_string())),
            Ok("still wrong".to_string()),
            Err(ModelCallError::Transport("last".to_string())),
        ]);
        let executor = StepExecutor::new(&caller);

        let err = executor
            .execute(&step(2, Some("done")), None)
            .await
            .unwrap_err();
        assert_eq!(caller.calls(), 3);
        match err {
            StepFailure::ModelCall(ModelCallError::Transport(msg)) => assert_eq!(msg, "last"),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_retry_limit_means_single_attempt() {
        let caller = ScriptedCaller::new(vec![Ok("wrong".to_string())]);
        let executor = StepExecutor::new(&caller);

        let err = executor
            .execute(&step(0, Some("done")), None)
            .await
            .unwrap_err();
        assert_eq!(caller.calls(), 1);
        assert!(matches!(err, StepFailure::CriteriaNotMet { .. }));
    }

    #[tokio::test]
    async fn test_previous_output_flows_into_prompt() {
        let caller = ScriptedCaller::new(vec![Ok("ok".to_string())]);
        let executor = StepExecutor::new(&caller);

        executor
            .execute(&step(0, None), Some("earlier output"))
            .await
            .unwrap();
        let prompts = caller.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Previous step output:\nearlier output\n\nCurrent step:\ndo the thing"
        );
    }
}
