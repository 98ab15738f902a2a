//! Interactive session over a single orchestrator.

use rag_pipeline::RagOrchestrator;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::commands;

const PROMPT: &str = "rag> ";

const HELP: &str = "\
Commands:
  q <question>              ask a question
  i <doc1> | <doc2> | ...   ingest documents separated by '|'
  info                      show models and collection statistics
  clear                     remove every stored document
  help                      show this help
  exit                      leave the session";

/// One parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Ingest(Vec<String>),
    Info,
    Clear,
    Help,
    Exit,
    Empty,
}

impl ReplCommand {
    /// Parse a line. Unknown commands and missing arguments are errors with
    /// a message meant for the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head.to_lowercase().as_str() {
            "" => Ok(Self::Empty),
            "exit" | "quit" => Ok(Self::Exit),
            "help" | "?" => Ok(Self::Help),
            "info" => Ok(Self::Info),
            "clear" => Ok(Self::Clear),
            "q" | "ask" => {
                if rest.is_empty() {
                    Err("usage: q <question>".to_string())
                } else {
                    Ok(Self::Ask(rest.to_string()))
                }
            }
            "i" | "ingest" => {
                let documents: Vec<String> = rest
                    .split('|')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect();
                if documents.is_empty() {
                    Err("usage: i <doc1> | <doc2> | ...".to_string())
                } else {
                    Ok(Self::Ingest(documents))
                }
            }
            other => Err(format!("unknown command '{other}', type 'help' for a list")),
        }
    }
}

/// Run the session until `exit` or end of input. Command failures are
/// printed and the session continues.
pub async fn run(orchestrator: &RagOrchestrator) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("RAG interactive session. Type 'help' for commands.");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        let command = match ReplCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let outcome = match command {
            ReplCommand::Empty => Ok(()),
            ReplCommand::Exit => break,
            ReplCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ReplCommand::Ask(question) => {
                commands::ask(orchestrator, &question, orchestrator.answer_defaults(), false).await
            }
            ReplCommand::Ingest(documents) => {
                commands::ingest_texts(orchestrator, documents, None).await
            }
            ReplCommand::Info => commands::info(orchestrator).await,
            ReplCommand::Clear => match editor.readline("Remove every stored document? [y/N] ") {
                Ok(answer) if commands::is_yes(&answer) => {
                    commands::clear_confirmed(orchestrator).await
                }
                Ok(_) => {
                    println!("Cancelled.");
                    Ok(())
                }
                Err(ReadlineError::Eof) => break,
                Err(_) => Ok(()),
            },
        };
        if let Err(e) = outcome {
            warn!(error = %e, "interactive command failed");
            println!("error: {e:#}");
        }
    }

    println!("Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_keeps_inner_spacing() {
        assert_eq!(
            ReplCommand::parse("q   What is  AI? "),
            Ok(ReplCommand::Ask("What is  AI?".to_string()))
        );
    }

    #[test]
    fn ingest_splits_on_pipes() {
        assert_eq!(
            ReplCommand::parse("i first doc | second doc ||"),
            Ok(ReplCommand::Ingest(vec!["first doc".into(), "second doc".into()]))
        );
    }

    #[test]
    fn bare_keywords() {
        assert_eq!(ReplCommand::parse("INFO"), Ok(ReplCommand::Info));
        assert_eq!(ReplCommand::parse("clear"), Ok(ReplCommand::Clear));
        assert_eq!(ReplCommand::parse("help"), Ok(ReplCommand::Help));
        assert_eq!(ReplCommand::parse("quit"), Ok(ReplCommand::Exit));
        assert_eq!(ReplCommand::parse("   "), Ok(ReplCommand::Empty));
    }

    #[test]
    fn missing_arguments_and_unknown_commands_are_errors() {
        assert!(ReplCommand::parse("q").is_err());
        assert!(ReplCommand::parse("i | |").is_err());
        let err = ReplCommand::parse("frobnicate now").unwrap_err();
        assert!(err.contains("frobnicate"));
    }
}
