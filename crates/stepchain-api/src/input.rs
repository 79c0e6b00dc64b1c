//! Workflow input parsing and validation.
//!
//! The same JSON shape is accepted by `POST /api/v1/workflows` and by
//! `stepchain create <file.json>`. IDs and timestamps are assigned here, so
//! callers never supply them.

use chrono::Utc;
use serde::Deserialize;
use stepchain_types::workflow::{StepDefinition, WorkflowDefinition};
use uuid::Uuid;

/// Incoming workflow definition, before IDs are assigned.
#[derive(Debug, Deserialize)]
pub struct WorkflowInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
}

/// Incoming step definition.
#[derive(Debug, Deserialize)]
pub struct StepInput {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub completion_criteria: Option<String>,
    #[serde(default)]
    pub retry_limit: u32,
    pub step_order: i32,
}

impl WorkflowInput {
    /// Validate the input and convert it into a stored definition.
    pub fn into_definition(self) -> Result<WorkflowDefinition, String> {
        if self.name.trim().is_empty() {
            return Err("workflow name must not be empty".to_string());
        }

        for (i, step) in self.steps.iter().enumerate() {
            if step.model.trim().is_empty() {
                return Err(format!("step {i}: model must not be empty"));
            }
            if step.prompt.trim().is_empty() {
                return Err(format!("step {i}: prompt must not be empty"));
            }
            if step.step_order < 0 {
                return Err(format!("step {i}: step_order must not be negative"));
            }
        }

        Ok(WorkflowDefinition {
            id: Uuid::now_v7(),
            name: self.name,
            description: self.description,
            steps: self
                .steps
                .into_iter()
                .map(|s| StepDefinition {
                    id: Uuid::now_v7(),
                    model: s.model,
                    prompt: s.prompt,
                    completion_criteria: s.completion_criteria,
                    retry_limit: s.retry_limit,
                    step_order: s.step_order,
                })
                .collect(),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, steps: Vec<StepInput>) -> WorkflowInput {
        WorkflowInput {
            name: name.to_string(),
            description: None,
            steps,
        }
    }

    fn step(model: &str, prompt: &str, step_order: i32) -> StepInput {
        StepInput {
            model: model.to_string(),
            prompt: prompt.to_string(),
            completion_criteria: None,
            retry_limit: 0,
            step_order,
        }
    }

    #[test]
    fn test_valid_input_gets_ids_assigned() {
        let def = input("pipeline", vec![step("gpt-4o-mini", "do it", 0)])
            .into_definition()
            .unwrap();
        assert_eq!(def.name, "pipeline");
        assert_eq!(def.steps.len(), 1);
        assert!(!def.steps[0].id.is_nil());
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = input("  ", vec![]).into_definition().unwrap_err();
        assert!(err.contains("name"));
    }

    #[test]
    fn test_blank_model_and_prompt_rejected() {
        assert!(input("wf", vec![step("", "p", 0)]).into_definition().is_err());
        assert!(input("wf", vec![step("m", " ", 0)]).into_definition().is_err());
    }

    #[test]
    fn test_negative_step_order_rejected() {
        let err = input("wf", vec![step("m", "p", -1)])
            .into_definition()
            .unwrap_err();
        assert!(err.contains("step_order"));
    }

    #[test]
    fn test_empty_steps_allowed() {
        assert!(input("wf", vec![]).into_definition().is_ok());
    }

    #[test]
    fn test_parses_minimal_json() {
        let raw = r#"{
            "name": "haiku chain",
            "steps": [
                {"model": "gpt-4o-mini", "prompt": "Write a haiku", "step_order": 0}
            ]
        }"#;
        let parsed: WorkflowInput = serde_json::from_str(raw).unwrap();
        let def = parsed.into_definition().unwrap();
        assert_eq!(def.steps[0].retry_limit, 0);
        assert!(def.steps[0].completion_criteria.is_none());
    }
}
