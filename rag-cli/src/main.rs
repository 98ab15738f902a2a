use clap::Parser;
use rag_cli::cli::{Cli, Command};
use rag_cli::{commands, logging, repl};
use rag_pipeline::{RagOrchestrator, RagSettings};
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = RagSettings::from_env()?;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    let _log_guard = logging::init(&settings.logging)?;

    let orchestrator = RagOrchestrator::from_settings(settings).await?;
    debug!(command = ?cli.command, "running command");

    match cli.command {
        Command::Ingest { texts, file, source } => {
            commands::ingest(&orchestrator, texts, file.as_deref(), source).await
        }
        Command::Ask { question, no_rerank, limit, top_n, json } => {
            let options =
                commands::answer_options(orchestrator.answer_defaults(), no_rerank, limit, top_n);
            commands::ask(&orchestrator, &question, options, json).await
        }
        Command::Info => commands::info(&orchestrator).await,
        Command::Clear { yes } => commands::clear(&orchestrator, yes).await,
        Command::Interactive => repl::run(&orchestrator).await,
    }
}
