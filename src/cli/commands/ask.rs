//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use crate::rag::format_sources_for_display;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, orchestrator: &Orchestrator) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, orchestrator.settings()) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let engine = match model.as_deref() {
        Some(model) => orchestrator.rag_engine_with_model(model),
        None => orchestrator.rag_engine(),
    };

    let spinner = Output::spinner("Searching documents...");
    let result = engine.ask(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);

            if !response.citations.is_empty() {
                Output::header("Cited sources");
                for citation in &response.citations {
                    Output::list_item(&format!("{}, page {}", citation.document, citation.page));
                }
            }

            if !response.context_hits.is_empty() {
                Output::header("Retrieved context");
                for line in format_sources_for_display(&response.context_hits).lines() {
                    Output::list_item(line);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
