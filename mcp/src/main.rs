//! MCP stdio server that delegates agent tasks to external AI CLIs.
//!
//! Requests arrive as line-delimited JSON-RPC on stdin and responses leave on
//! stdout. Diagnostics go to stderr only.

mod handlers;
mod protocol;
mod server;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use subagents_runner::io::agents::YamlAgentRepository;
use subagents_runner::io::config::load_config;
use subagents_runner::io::path::resolve_dir;
use subagents_runner::{RunnerRegistry, Selector, logging};

use crate::handlers::Handlers;
use crate::server::Server;

#[derive(Parser, Debug)]
#[command(name = "subagents-mcp", version)]
#[command(about = "Delegate agent tasks to codex, copilot or gemini over MCP stdio")]
struct Args {
    /// Absolute directory containing agent persona files (*.yaml)
    #[arg(long)]
    agents_dir: PathBuf,

    /// Preferred runner tried before the configured order (codex, copilot, gemini)
    #[arg(long)]
    runner: Option<String>,

    /// Runner configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    logging::init();
    let code = match run(Args::parse()).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err:#}");
            1
        }
    };
    // The blocking stdin reader cannot be interrupted; exit without waiting
    // for the runtime to shut down.
    std::process::exit(code);
}

async fn run(args: Args) -> Result<()> {
    let agents_dir = resolve_dir(&args.agents_dir)
        .with_context(|| format!("agents dir {}", args.agents_dir.display()))?;
    let config = load_config(args.config.as_deref())?;
    let selector = Selector::new(&RunnerRegistry::builtin(), &config, args.runner.as_deref())?;

    info!(
        agents_dir = %agents_dir.display(),
        config = ?args.config,
        order = ?selector.attempt_order(),
        "starting subagents-mcp"
    );

    let handlers = Handlers::new(
        Arc::new(YamlAgentRepository::new(agents_dir)),
        Arc::new(selector),
    );
    let server = Server::new(handlers)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    server.serve(stdin, stdout, &cancel).await
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received interrupt"),
        () = terminate => info!("received terminate"),
    }
    token.cancel();
}
