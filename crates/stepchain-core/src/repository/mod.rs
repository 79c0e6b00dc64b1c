//! Repository trait definitions (ports implemented by stepchain-infra).

pub mod workflow;
