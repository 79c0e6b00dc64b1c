//! stepchain CLI and REST API entry point.
//!
//! Binary name: `stepchain`
//!
//! Parses CLI arguments, initializes the database and engine, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod input;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,stepchain=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "stepchain", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, engine)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Create { file } => {
            cli::workflow::create_workflow(&state, &file, cli.json).await?;
        }

        Commands::List => {
            cli::workflow::list_workflows(&state, cli.json).await?;
        }

        Commands::Run { workflow } => {
            cli::workflow::run_workflow(&state, &workflow, cli.json).await?;
        }

        Commands::Runs { workflow, limit } => {
            cli::workflow::list_runs(&state, workflow.as_deref(), limit, cli.json).await?;
        }

        Commands::Show { run_id } => {
            cli::workflow::show_run(&state, &run_id, cli.json).await?;
        }

        Commands::Delete { workflow } => {
            cli::workflow::delete_workflow(&state, &workflow, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} stepchain API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            if state.engine.is_none() {
                println!(
                    "  {}",
                    console::style(
                        "Warning: STEPCHAIN_API_KEY not set; run endpoints will return 503"
                    )
                    .yellow()
                );
            }
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
