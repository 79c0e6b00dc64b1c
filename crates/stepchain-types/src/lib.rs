//! Shared domain types for stepchain.
//!
//! This crate contains the core domain types used across the stepchain
//! platform: workflow definitions, execution runs, step logs, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod error;
pub mod llm;
pub mod workflow;
