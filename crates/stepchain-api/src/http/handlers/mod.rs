//! REST API request handlers.

pub mod workflow;
