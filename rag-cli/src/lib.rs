//! Command-line front end for `rag-pipeline`.
//!
//! The `rag` binary wires environment settings, logging, and one
//! [`RagOrchestrator`](rag_pipeline::RagOrchestrator) together, then runs a
//! single subcommand or an interactive session.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod repl;
