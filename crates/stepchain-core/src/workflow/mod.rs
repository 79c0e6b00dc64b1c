//! Workflow engine core: completion checking, context chaining, retries,
//! and run orchestration.
//!
//! - `completion` -- the completion-criteria predicate
//! - `context` -- prompt composition from the previous step's output
//! - `state` -- explicit status-transition functions for runs and step logs
//! - `executor` -- drives one step through its retry budget
//! - `engine` -- orchestrates the ordered step sequence and owns run state

pub mod completion;
pub mod context;
pub mod engine;
pub mod executor;
pub mod state;
