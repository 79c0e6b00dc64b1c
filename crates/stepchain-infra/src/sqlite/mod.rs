//! SQLite persistence.

pub mod pool;
pub mod workflow;

pub use pool::DatabasePool;
pub use workflow::SqliteWorkflowRepository;
