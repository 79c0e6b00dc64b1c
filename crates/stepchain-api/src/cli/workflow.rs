//! CLI workflow management subcommands.
//!
//! Provides create, list, run, runs, show, and delete operations for
//! workflow definitions and runs.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use stepchain_core::repository::workflow::WorkflowRepository;
use stepchain_types::workflow::{RunStatus, StepStatus, WorkflowDefinition, WorkflowRun};

use crate::input::WorkflowInput;
use crate::state::AppState;

/// Resolve a workflow by UUID or exact name.
async fn resolve_workflow(target: &str, state: &AppState) -> Result<WorkflowDefinition> {
    if let Ok(id) = target.parse::<uuid::Uuid>() {
        if let Some(def) = state
            .repo
            .get_definition(&id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to look up workflow: {e}"))?
        {
            return Ok(def);
        }
    }

    let defs = state
        .repo
        .list_definitions()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list workflows: {e}"))?;

    defs.into_iter()
        .find(|d| d.name == target)
        .ok_or_else(|| anyhow::anyhow!("Workflow '{}' not found", target))
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

pub async fn create_workflow(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let input: WorkflowInput =
        serde_json::from_str(&raw).with_context(|| "Failed to parse workflow JSON")?;
    let def = input
        .into_definition()
        .map_err(|msg| anyhow::anyhow!("Workflow validation failed: {msg}"))?;

    state
        .repo
        .save_definition(&def)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save workflow: {e}"))?;

    if json {
        let out = serde_json::json!({
            "id": def.id.to_string(),
            "name": def.name,
            "steps": def.steps.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Created workflow '{}'",
            style("*").green().bold(),
            style(&def.name).cyan()
        );
        println!("  ID: {}", def.id);
        println!("  Steps: {}", def.steps.len());
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub async fn list_workflows(state: &AppState, json: bool) -> Result<()> {
    let defs = state
        .repo
        .list_definitions()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list workflows: {e}"))?;

    if json {
        let out: Vec<_> = defs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id.to_string(),
                    "name": d.name,
                    "steps": d.steps.len(),
                    "created_at": d.created_at.to_rfc3339(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if defs.is_empty() {
        println!();
        println!("  No workflows registered.");
        println!(
            "  Create one with: {}",
            style("stepchain create <file.json>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("ID"),
            Cell::new("Steps"),
            Cell::new("Created"),
        ]);

    for d in &defs {
        table.add_row(vec![
            Cell::new(&d.name),
            Cell::new(short_id(&d.id)),
            Cell::new(d.steps.len()),
            Cell::new(d.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub async fn run_workflow(state: &AppState, target: &str, json: bool) -> Result<()> {
    let def = resolve_workflow(target, state).await?;
    let engine = state.require_engine()?;

    if !json {
        println!();
        println!(
            "  {} Running workflow '{}' ({} steps)...",
            style("*").bold(),
            style(&def.name).cyan(),
            def.steps.len()
        );
    }

    let completed = engine
        .run(&def)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start run: {e}"))?;

    if json {
        let out = serde_json::json!({
            "run_id": completed.run_id.to_string(),
            "success": completed.result.success,
            "step_outputs": completed.result.step_outputs,
            "error_message": completed.result.error_message,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("  Run ID: {}", completed.run_id);
    println!();

    for (i, output) in completed.result.step_outputs.iter().enumerate() {
        println!("  {} step {i}", style("✓").green());
        for line in output.lines() {
            println!("    {}", style(line).dim());
        }
    }

    if completed.result.success {
        println!();
        println!("  {} Run succeeded", style("✓").green().bold());
    } else {
        println!();
        println!(
            "  {} Run failed: {}",
            style("✗").red().bold(),
            completed
                .result
                .error_message
                .as_deref()
                .unwrap_or("unknown error")
        );
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

pub async fn list_runs(
    state: &AppState,
    target: Option<&str>,
    limit: u32,
    json: bool,
) -> Result<()> {
    let runs = match target {
        Some(t) => {
            let def = resolve_workflow(t, state).await?;
            state
                .repo
                .list_runs_for_workflow(&def.id, limit)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list runs: {e}"))?
        }
        None => state
            .repo
            .list_runs(limit)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list runs: {e}"))?,
    };

    if json {
        let out: Vec<_> = runs.iter().map(run_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!();
        println!("  No runs yet.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Run ID").fg(Color::Cyan),
            Cell::new("Workflow"),
            Cell::new("Status"),
            Cell::new("Started"),
            Cell::new("Completed"),
        ]);

    for r in &runs {
        let completed = r
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(short_id(&r.id)),
            Cell::new(&r.workflow_name),
            run_status_cell(r.status),
            Cell::new(r.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(completed),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

pub async fn show_run(state: &AppState, run_id: &str, json: bool) -> Result<()> {
    let id = run_id
        .parse::<uuid::Uuid>()
        .with_context(|| format!("'{run_id}' is not a valid run ID"))?;

    let run = state
        .repo
        .get_run(&id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get run: {e}"))?
        .ok_or_else(|| anyhow::anyhow!("Run '{}' not found", run_id))?;

    let logs = state
        .repo
        .list_step_logs(&id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get step logs: {e}"))?;

    if json {
        let mut out = run_json(&run);
        out["steps"] = serde_json::to_value(&logs)?;
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  Run {} of workflow '{}'",
        style(run.id).cyan(),
        style(&run.workflow_name).cyan()
    );
    println!("  Status: {}", styled_run_status(run.status));
    if let Some(error) = &run.error {
        println!("  Error: {}", style(error).red());
    }
    println!();

    if logs.is_empty() {
        println!("  No steps executed.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Retries"),
            Cell::new("Output / Error"),
        ]);

    for log in &logs {
        let detail = match log.status {
            StepStatus::Failed => log.error.clone().unwrap_or_default(),
            _ => log.output.clone().unwrap_or_default(),
        };

        table.add_row(vec![
            Cell::new(log.step_order),
            step_status_cell(log.status),
            Cell::new(log.retry_count),
            Cell::new(truncate(&detail, 80)),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

pub async fn delete_workflow(state: &AppState, target: &str, json: bool) -> Result<()> {
    let def = resolve_workflow(target, state).await?;

    let deleted = state
        .repo
        .delete_definition(&def.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete workflow: {e}"))?;
    if !deleted {
        anyhow::bail!("Workflow '{}' not found", target);
    }

    if json {
        let out = serde_json::json!({
            "id": def.id.to_string(),
            "name": def.name,
            "deleted": true,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Deleted workflow '{}'",
            style("*").green().bold(),
            style(&def.name).cyan()
        );
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn truncate(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}…")
    }
}

fn run_json(r: &WorkflowRun) -> serde_json::Value {
    serde_json::json!({
        "run_id": r.id.to_string(),
        "workflow_id": r.workflow_id.to_string(),
        "workflow_name": r.workflow_name,
        "status": status_label(r.status),
        "error": r.error,
        "created_at": r.created_at.to_rfc3339(),
        "completed_at": r.completed_at.map(|t| t.to_rfc3339()),
    })
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Success => "success",
        RunStatus::Failed => "failed",
    }
}

fn styled_run_status(status: RunStatus) -> String {
    match status {
        RunStatus::Running => style("running").yellow().to_string(),
        RunStatus::Success => style("success").green().to_string(),
        RunStatus::Failed => style("failed").red().to_string(),
    }
}

fn run_status_cell(status: RunStatus) -> Cell {
    match status {
        RunStatus::Running => Cell::new("running").fg(Color::Yellow),
        RunStatus::Success => Cell::new("success").fg(Color::Green),
        RunStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}

fn step_status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Running => Cell::new("running").fg(Color::Yellow),
        StepStatus::Completed => Cell::new("completed").fg(Color::Green),
        StepStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}
