//! Infrastructure layer for stepchain.
//!
//! Concrete implementations of the core ports: SQLite persistence for the
//! `WorkflowRepository` trait and an OpenAI-compatible HTTP client for the
//! `ModelCaller` trait.

pub mod llm;
pub mod sqlite;
