//! Application state wiring the engine and repository together.
//!
//! AppState holds the concrete instances used by both CLI and REST API. The
//! engine is generic over repository/model-caller traits, but AppState pins
//! it to the SQLite repository and the OpenAI-compatible HTTP client.

use std::path::PathBuf;
use std::sync::Arc;

use stepchain_core::workflow::engine::WorkflowEngine;
use stepchain_infra::llm::OpenAiCompatClient;
use stepchain_infra::sqlite::pool::DatabasePool;
use stepchain_infra::sqlite::SqliteWorkflowRepository;
use stepchain_types::llm::ModelCallError;

/// Engine generics pinned to the infra implementations.
pub type ConcreteEngine = WorkflowEngine<SqliteWorkflowRepository, OpenAiCompatClient>;

/// Shared application state.
///
/// The engine is `None` when no model backend is configured
/// (`STEPCHAIN_API_KEY` unset); read-only commands still work without it.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<SqliteWorkflowRepository>,
    pub engine: Option<Arc<ConcreteEngine>>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the DB, wire the engine.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("stepchain.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;
        let repo = Arc::new(SqliteWorkflowRepository::new(db_pool.clone()));

        let engine = match OpenAiCompatClient::from_env() {
            Ok(client) => Some(Arc::new(WorkflowEngine::new(repo.clone(), client))),
            Err(ModelCallError::MissingConfig(var)) => {
                tracing::debug!(var, "no model backend configured");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            repo,
            engine,
            data_dir,
            db_pool,
        })
    }

    /// The engine, or an error telling the user how to configure one.
    pub fn require_engine(&self) -> anyhow::Result<&Arc<ConcreteEngine>> {
        self.engine.as_ref().ok_or_else(|| {
            anyhow::anyhow!("no model backend configured; set STEPCHAIN_API_KEY")
        })
    }
}

/// Resolve the data directory from `STEPCHAIN_DATA_DIR`, falling back to
/// `~/.stepchain`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("STEPCHAIN_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stepchain"),
    }
}
