//! Subcommand handlers. Each one drives the orchestrator and prints its
//! outcome to stdout; failures are returned so the binary exits non-zero.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, bail};
use rag_pipeline::{AnswerOptions, AnswerResult, Metadata, RagOrchestrator, SystemInfo};

/// Ingest `texts` plus the non-empty lines of `file`.
pub async fn ingest(
    orchestrator: &RagOrchestrator,
    texts: Vec<String>,
    file: Option<&Path>,
    source: Option<String>,
) -> anyhow::Result<()> {
    let file_content = match file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let documents = collect_documents(texts, file_content.as_deref());
    ingest_texts(orchestrator, documents, source).await
}

/// Ingest already collected texts.
pub async fn ingest_texts(
    orchestrator: &RagOrchestrator,
    documents: Vec<String>,
    source: Option<String>,
) -> anyhow::Result<()> {
    if documents.is_empty() {
        bail!("nothing to ingest");
    }
    let metadatas = source.map(|source| source_metadata(&source, documents.len()));
    if !orchestrator.ingest(&documents, metadatas, None).await {
        bail!("ingestion failed, see the log for details");
    }
    println!("Ingested {} document(s).", documents.len());
    Ok(())
}

/// Answer one question and print the result.
pub async fn ask(
    orchestrator: &RagOrchestrator,
    question: &str,
    options: AnswerOptions,
    json: bool,
) -> anyhow::Result<()> {
    let result = orchestrator.answer(question, options).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_answer(&result));
    }
    Ok(())
}

/// Print system diagnostics as JSON.
pub async fn info(orchestrator: &RagOrchestrator) -> anyhow::Result<()> {
    let info = orchestrator.system_info().await;
    println!("{}", serde_json::to_string_pretty(&info)?);
    if let SystemInfo::Unavailable { error } = info {
        bail!("system info unavailable: {error}");
    }
    Ok(())
}

/// Clear the collection, asking on stdin first unless `yes` is set.
pub async fn clear(orchestrator: &RagOrchestrator, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm("Remove every stored document?")? {
        println!("Cancelled.");
        return Ok(());
    }
    clear_confirmed(orchestrator).await
}

pub(crate) async fn clear_confirmed(orchestrator: &RagOrchestrator) -> anyhow::Result<()> {
    if !orchestrator.clear_database().await {
        bail!("failed to clear the database, see the log for details");
    }
    println!("Database cleared.");
    Ok(())
}

/// Apply command-line overrides on top of the orchestrator's defaults.
pub fn answer_options(
    defaults: AnswerOptions,
    no_rerank: bool,
    limit: Option<usize>,
    top_n: Option<usize>,
) -> AnswerOptions {
    let mut options = defaults;
    if no_rerank {
        options = options.use_rerank(false);
    }
    if let Some(limit) = limit {
        options = options.retrieve_limit(limit);
    }
    if let Some(top_n) = top_n {
        options = options.top_n(top_n);
    }
    options
}

fn collect_documents(texts: Vec<String>, file_content: Option<&str>) -> Vec<String> {
    let from_file = file_content
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string);
    texts.into_iter().filter(|t| !t.trim().is_empty()).chain(from_file).collect()
}

fn source_metadata(source: &str, count: usize) -> Vec<Metadata> {
    vec![HashMap::from([("source".to_string(), source.to_string())]); count]
}

fn render_answer(result: &AnswerResult) -> String {
    let mut out = format!("Answer: {}", result.answer);
    if !result.retrieved.is_empty() {
        out.push_str(&format!(
            "\n\nRetrieved {} document(s), reranked {}.",
            result.retrieved.len(),
            result.reranked.len()
        ));
        if result.reranked.is_empty() {
            for item in &result.retrieved {
                out.push_str(&format!("\n  [{:.4}] {}", item.distance, snippet(&item.document_text)));
            }
        } else {
            for item in &result.reranked {
                out.push_str(&format!(
                    "\n  [{:.4}] {}",
                    item.relevance_score,
                    snippet(&item.document_text)
                ));
            }
        }
    }
    out
}

fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= MAX_CHARS {
        single_line
    } else {
        format!("{}...", single_line.chars().take(MAX_CHARS).collect::<String>())
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(is_yes(&line))
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
