use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ingest documents and ask grounded questions against a RAG collection.
///
/// Provider credentials and endpoints are read from the environment (a
/// `.env` file in the working directory is loaded first).
#[derive(Debug, Parser)]
#[command(name = "rag", version, about)]
pub struct Cli {
    /// Override the log level (e.g. `debug`, `rag_pipeline=trace`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Embed and store documents
    Ingest {
        /// Document texts, one per argument
        texts: Vec<String>,
        /// Read additional documents from a file, one per non-empty line
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Value of the `source` metadata field for every document
        #[arg(long, short)]
        source: Option<String>,
    },
    /// Answer a question from the stored documents
    Ask {
        /// The question
        question: String,
        /// Skip reranking and use retrieval order
        #[arg(long)]
        no_rerank: bool,
        /// Number of documents to retrieve
        #[arg(long, short)]
        limit: Option<usize>,
        /// Number of documents kept as context
        #[arg(long)]
        top_n: Option<usize>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show models and collection statistics
    Info,
    /// Remove every stored document
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Start an interactive session
    Interactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_flags_parse() {
        let cli = Cli::parse_from([
            "rag", "ask", "What is AI?", "--no-rerank", "--limit", "8", "--top-n", "2", "--json",
        ]);
        match cli.command {
            Command::Ask { question, no_rerank, limit, top_n, json } => {
                assert_eq!(question, "What is AI?");
                assert!(no_rerank);
                assert_eq!(limit, Some(8));
                assert_eq!(top_n, Some(2));
                assert!(json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ingest_accepts_texts_and_file() {
        let cli =
            Cli::parse_from(["rag", "--log-level", "debug", "ingest", "a", "b", "--file", "docs.txt"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Ingest { texts, file, source } => {
                assert_eq!(texts, ["a", "b"]);
                assert_eq!(file, Some(PathBuf::from("docs.txt")));
                assert!(source.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
