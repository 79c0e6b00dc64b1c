//! Workflow execution engine and trait definitions for stepchain.
//!
//! This crate defines the "ports" (repository and model-caller traits) that
//! the infrastructure layer implements, plus the engine that drives a
//! workflow run. It depends only on `stepchain-types` -- never on
//! `stepchain-infra` or any database/IO crate.

pub mod llm;
pub mod repository;
pub mod workflow;
